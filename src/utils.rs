#[cfg(feature = "serde")]
/// Reads `filepath` and deserializes its JSON content.
pub fn read_json<T>(filepath: &std::path::Path) -> crate::errors::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    use crate::errors::Error;
    use std::{fs::File, io::BufReader};

    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

/// Generates a random ID.
pub fn random_id() -> u64 {
    rand::random()
}
