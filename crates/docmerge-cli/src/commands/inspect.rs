use std::path::PathBuf;

use docmerge_core::error::DocmergeError;
use docmerge_core::inspect::{compare_with_columns, inspect_template};

use crate::output;

pub fn run(
    template: PathBuf,
    data: Option<PathBuf>,
    sheet: Option<String>,
) -> Result<(), DocmergeError> {
    let bytes = std::fs::read(&template)?;
    let names = inspect_template(&bytes)?;
    output::table::print_placeholders(&names);

    if let Some(data) = data {
        let table = docmerge_core::load_table(&data, sheet)?;
        let comparison = compare_with_columns(&names, &table.columns);
        output::table::print_comparison(&comparison);
    }

    Ok(())
}
