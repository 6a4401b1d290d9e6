use figment::providers::{Data, Format, Json, Toml, Yaml};
use std::path::Path;

/// Pick the figment provider matching a config file's extension.
///
/// Files with an unknown extension are sniffed; anything unrecognized is read
/// as TOML. Missing files contribute nothing.
pub fn auto<P: AsRef<Path>>(path: P) -> impl figment::Provider {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "toml" => SmartProvider::Toml(Toml::file(path)),
        "json" => SmartProvider::Json(Json::file(path)),
        "yaml" | "yml" => SmartProvider::Yaml(Yaml::file(path)),
        _ => {
            let detected = std::fs::read_to_string(path)
                .ok()
                .and_then(|content| detect_format_from_content(&content));
            tracing::debug!(
                "Config {} has no known extension, reading as {}",
                path.display(),
                detected.unwrap_or("toml")
            );
            match detected {
                Some("json") => SmartProvider::Json(Json::file(path)),
                Some("yaml") => SmartProvider::Yaml(Yaml::file(path)),
                _ => SmartProvider::Toml(Toml::file(path)),
            }
        }
    }
}

/// Wrapper enum to handle different provider types
enum SmartProvider {
    Toml(Data<Toml>),
    Json(Data<Json>),
    Yaml(Data<Yaml>),
}

impl figment::Provider for SmartProvider {
    fn metadata(&self) -> figment::Metadata {
        match self {
            SmartProvider::Toml(p) => p.metadata(),
            SmartProvider::Json(p) => p.metadata(),
            SmartProvider::Yaml(p) => p.metadata(),
        }
    }

    fn data(
        &self,
    ) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        match self {
            SmartProvider::Toml(p) => p.data(),
            SmartProvider::Json(p) => p.data(),
            SmartProvider::Yaml(p) => p.data(),
        }
    }
}

fn detect_format_from_content(content: &str) -> Option<&'static str> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') {
        return Some("json");
    }

    let first_line = trimmed
        .lines()
        .find(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))?;
    let first_line = first_line.trim();

    if first_line.starts_with('[') || first_line.contains(" = ") {
        Some("toml")
    } else if first_line == "---" || first_line.contains(": ") || first_line.ends_with(':') {
        Some("yaml")
    } else {
        None
    }
}
