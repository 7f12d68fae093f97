use crate::decompose::{DecompositionPipeline, FieldKeySpec, Mode, OutputFormat};
use crate::error::ConfigError;
use crate::filter::{
    EtlInterceptor, InterceptorChain, LogKind, MarkerInterceptor, RouteInterceptor,
    TimestampInterceptor, TypeInterceptor,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Everything needed for one decomposition run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub mode: Mode,

    /// Keys to project; anything other than strings is rejected at setup
    #[serde(default)]
    pub keys: Vec<Value>,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Emit a header line with the column names (TSV only)
    #[serde(default)]
    pub header: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Drop records that fail the shape check for their log kind
    #[serde(default)]
    pub drop_invalid: bool,

    /// Only process start or event logs
    pub kind: Option<LogKind>,

    /// Marker removed from every record before anything else
    pub strip_marker: Option<String>,

    /// Prefix every record with the current epoch millis
    #[serde(default)]
    pub stamp: bool,
}

impl RunConfig {
    pub fn new(mode: Mode) -> Self {
        RunConfig {
            mode,
            keys: Vec::new(),
            output: OutputConfig::default(),
            filter: FilterConfig::default(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML config")
    }

    /// Replace the keys with plain strings, e.g. from the command line
    pub fn set_keys<S: AsRef<str>>(&mut self, keys: &[S]) {
        self.keys = keys
            .iter()
            .map(|k| Value::String(k.as_ref().to_string()))
            .collect();
    }

    /// Resolve the keys and set up the pipeline
    pub fn build_pipeline(&self) -> std::result::Result<DecompositionPipeline, ConfigError> {
        let spec = FieldKeySpec::from_values(&self.keys)?;
        DecompositionPipeline::with_spec(spec, self.mode)
    }

    /// Interceptors in application order: strip marker, stamp, tag, route, validate
    pub fn build_chain(&self) -> InterceptorChain {
        let mut chain = InterceptorChain::new();
        if let Some(marker) = &self.filter.strip_marker {
            chain.push(Box::new(MarkerInterceptor::new(marker.clone())));
        }
        if self.filter.stamp {
            chain.push(Box::new(TimestampInterceptor::new()));
        }
        if let Some(kind) = self.filter.kind {
            chain.push(Box::new(TypeInterceptor));
            chain.push(Box::new(RouteInterceptor::new(kind)));
        }
        if self.filter.drop_invalid {
            chain.push(Box::new(EtlInterceptor));
        }
        chain
    }
}
