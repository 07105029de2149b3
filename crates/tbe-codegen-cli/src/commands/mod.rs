pub mod generate;
pub mod list;
pub mod show;
pub mod validate;

/// Output format shared by the read-only commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}', expected 'text' or 'json'")),
        }
    }
}
