use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

const LINE_HEIGHT: i64 = 16;

/// One printed page of a price list: a heading, then an optional column
/// line that opens the table, then data rows with cells two spaces apart.
pub struct PriceListPage<'a> {
    pub heading: &'a str,
    pub columns: Option<&'a [&'a str]>,
    pub rows: &'a [&'a [&'a str]],
}

impl PriceListPage<'_> {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.heading.to_string()];
        lines.extend(self.columns.map(|columns| columns.join("  ")));
        lines.extend(self.rows.iter().map(|cells| cells.join("  ")));
        lines
    }
}

fn page_content(lines: &[String]) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 11.into()]),
    ];
    for (index, line) in lines.iter().enumerate() {
        let offset = if index == 0 {
            vec![40.into(), 800.into()]
        } else {
            vec![0.into(), (-LINE_HEIGHT).into()]
        };
        operations.push(Operation::new("Td", offset));
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

fn add_page(
    doc: &mut Document,
    parent: ObjectId,
    page: &PriceListPage<'_>,
) -> Result<ObjectId, Box<dyn std::error::Error>> {
    let stream = Stream::new(dictionary! {}, page_content(&page.lines()).encode()?);
    let content_id = doc.add_object(stream);
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => content_id,
    }))
}

/// Writes a price-list PDF with a real text layer, one entry per page.
pub fn create_price_list_pdf(
    path: &Path,
    pages: &[PriceListPage<'_>],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");
    let tree_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let kids = pages
        .iter()
        .map(|page| add_page(&mut doc, tree_id, page).map(Object::from))
        .collect::<Result<Vec<_>, _>>()?;
    let count = i64::try_from(kids.len())?;

    doc.objects.insert(
        tree_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => tree_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path)?;
    Ok(())
}
