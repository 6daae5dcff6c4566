//! Load a [`LoopConfig`] from RON, TOML or JSON.
//!
//! The format is detected from the file extension. Only available with the
//! `data-loader` feature.

use crate::config::LoopConfig;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("{format:?} parse error: {detail}")]
    Parse { format: Format, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Parse a config from a string in the given format.
pub fn parse_config(text: &str, format: Format) -> Result<LoopConfig, ConfigError> {
    let parse_err = |detail: String| ConfigError::Parse { format, detail };
    match format {
        Format::Ron => ron::from_str(text).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(text).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(text).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and parse it according to its extension.
pub fn load_config(path: &Path) -> Result<LoopConfig, ConfigError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text, format)?;
    tracing::debug!(
        path = %path.display(),
        nodes = config.layout.nodes.len(),
        "loaded loop config"
    );
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::layout::LayoutConfig;
    use crate::node::NodeType;

    #[test]
    fn detect_known_extensions() {
        assert_eq!(detect_format(Path::new("loop.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a/b/loop.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("loop.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_rejects_unknown_extension() {
        assert!(matches!(
            detect_format(Path::new("loop.yaml")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
        assert!(detect_format(Path::new("loop")).is_err());
    }

    #[test]
    fn json_engine_section_only_keeps_default_layout() {
        let config = parse_config(r#"{"engine": {"event_capacity": 16}}"#, Format::Json).unwrap();
        assert_eq!(config.engine.event_capacity, 16);
        assert_eq!(config.engine.transport_unit_base, 10_000);
        assert_eq!(config.layout, LayoutConfig::basic_loop());
    }

    #[test]
    fn toml_engine_section() {
        let config = parse_config("[engine]\ntransport_unit_base = 500\n", Format::Toml).unwrap();
        assert_eq!(config.engine.transport_unit_base, 500);
    }

    #[test]
    fn ron_full_layout() {
        let text = r#"(
            engine: (transport_unit_base: 20000),
            layout: (
                nodes: [
                    (id: 0, node_type: Commissioning, coordinates: (x: 0, y: 2)),
                    (id: 1, node_type: Conveyor, coordinates: (x: 0, y: 1)),
                    (id: 2, node_type: Conveyor, coordinates: (x: 1, y: 1)),
                    (id: 3, node_type: Retrieval, coordinates: (x: 1, y: 0)),
                ],
                edges: [
                    (from: 0, to: 1),
                    (from: 1, to: 0),
                    (from: 1, to: 2),
                    (from: 2, to: 1),
                    (from: 3, to: 2, weight: 1),
                ],
            ),
        )"#;
        let config = parse_config(text, Format::Ron).unwrap();
        assert_eq!(config.engine.transport_unit_base, 20_000);
        assert_eq!(config.layout.nodes.len(), 4);
        assert_eq!(config.layout.nodes[3].node_type, NodeType::Retrieval);
        assert_eq!(config.layout.edges[4].from, NodeId(3));
        assert!(config.layout.warehouses.is_empty());

        let layout = config.layout.validate().unwrap();
        assert_eq!(layout.ring(), &[NodeId(1), NodeId(2)]);
    }

    #[test]
    fn parse_error_names_format() {
        let err = parse_config("not valid json {{{", Format::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: Format::Json, .. }));
        assert!(err.to_string().starts_with("Json parse error"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here/loop.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
