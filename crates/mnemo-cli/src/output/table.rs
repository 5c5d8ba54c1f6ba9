use anyhow::Result;
use comfy_table::{ContentArrangement, Table};

/// Table with the header row and dynamic column widths used by every listing.
pub fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_table(table: Table) -> Result<()> {
    println!("{table}");
    Ok(())
}
