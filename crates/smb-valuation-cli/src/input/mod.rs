pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// `--input` file if given, else piped stdin.
pub fn read_request<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_input(path);
    }
    stdin::read_stdin()?
        .ok_or_else(|| format!("--input file or piped stdin is required for {what}").into())
}
