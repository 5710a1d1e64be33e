use std::path::PathBuf;

use docmerge_core::error::DocmergeError;

use crate::output;

pub fn run(data: PathBuf, sheet: Option<String>) -> Result<(), DocmergeError> {
    let table = docmerge_core::load_table(&data, sheet)?;
    output::table::print_columns(&table);
    Ok(())
}
