use docmerge_core::error::DocmergeError;
use serde::Serialize;

pub fn print<T: Serialize>(value: &T) -> Result<(), DocmergeError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
