use crate::error::{FilterError, StyleError};
use crate::style::filter::Filter;
use crate::style::value::{Properties, PropertyValue};
use simd_json::OwnedValue;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const EMBEDDED_STYLE: &str = include_str!("../../styles/dark.json");

/// How a rule draws the features it matches
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Fill,
    Line,
    Symbol,
    /// Recognised by the document but never drawn (`background`, `raster`, ...)
    Other(String),
}

impl LayerKind {
    fn parse(kind: &str) -> Self {
        match kind {
            "fill" => LayerKind::Fill,
            "line" => LayerKind::Line,
            "symbol" => LayerKind::Symbol,
            other => LayerKind::Other(other.to_string()),
        }
    }
}

/// A fully resolved style layer. Immutable once the document is compiled.
#[derive(Clone, Debug)]
pub struct StyleRule {
    pub id: String,
    pub kind: LayerKind,
    pub source_layer: String,
    /// 0 means unbounded
    pub min_zoom: f64,
    /// 0 means unbounded
    pub max_zoom: f64,
    pub paint: HashMap<String, String>,
    pub layout: HashMap<String, String>,
    pub filter: Filter,
}

impl StyleRule {
    pub fn paint_property(&self, key: &str) -> Option<&str> {
        self.paint.get(key).map(String::as_str)
    }

    /// Draw colour: `line-color`, then `fill-color`, then white
    pub fn color_hex(&self) -> &str {
        self.paint_property("line-color")
            .or_else(|| self.paint_property("fill-color"))
            .unwrap_or("#ffffff")
    }

    pub fn visible_at(&self, zoom: f64) -> bool {
        !((self.min_zoom != 0.0 && zoom < self.min_zoom)
            || (self.max_zoom != 0.0 && zoom > self.max_zoom))
    }

    pub fn matches(&self, props: &Properties) -> bool {
        self.filter.matches(props)
    }
}

/// Problems found while compiling a document that did not stop it loading.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleDiagnostic {
    /// The layer's filter failed to compile; the rule never matches.
    InvalidFilter { layer_id: String, error: FilterError },
    /// `ref` names no earlier layer; the layer is used as written.
    UnknownRef { layer_id: String, reference: String },
    /// A `layers` entry that is not an object or has no id.
    InvalidLayer { index: usize },
}

/// Layer as written in the document, before inheritance.
#[derive(Clone, Debug, Default)]
struct RawLayer {
    id: String,
    reference: Option<String>,
    kind: Option<String>,
    source_layer: Option<String>,
    min_zoom: Option<f64>,
    max_zoom: Option<f64>,
    filter: Option<OwnedValue>,
    paint: Option<HashMap<String, String>>,
    layout: Option<HashMap<String, String>>,
}

impl RawLayer {
    fn parse(value: &OwnedValue) -> Option<Self> {
        let id = non_empty_str(field(value, "id")?)?;
        Some(Self {
            id,
            reference: field(value, "ref").and_then(non_empty_str),
            kind: field(value, "type").and_then(non_empty_str),
            source_layer: field(value, "source-layer").and_then(non_empty_str),
            min_zoom: field(value, "minzoom").and_then(number),
            max_zoom: field(value, "maxzoom").and_then(number),
            filter: field(value, "filter")
                .filter(|f| !matches!(f, OwnedValue::Static(simd_json::StaticNode::Null)))
                .cloned(),
            paint: field(value, "paint").map(string_map),
            layout: field(value, "layout").map(string_map),
        })
    }

    /// Fill every unset field from `parent`. Paint and layout only come over
    /// when this layer defines none of its own.
    fn inherit(self, parent: &RawLayer) -> Self {
        Self {
            kind: self.kind.or_else(|| parent.kind.clone()),
            source_layer: self.source_layer.or_else(|| parent.source_layer.clone()),
            min_zoom: self.min_zoom.or(parent.min_zoom),
            max_zoom: self.max_zoom.or(parent.max_zoom),
            filter: self.filter.or_else(|| parent.filter.clone()),
            paint: self.paint.or_else(|| parent.paint.clone()),
            layout: self.layout.or_else(|| parent.layout.clone()),
            ..self
        }
    }

    fn hidden(&self) -> bool {
        self.layout
            .as_ref()
            .and_then(|l| l.get("visibility"))
            .is_some_and(|v| v == "none")
    }
}

/// Compiled style document: rules grouped by source layer in document order.
pub struct Styler {
    name: String,
    rules_by_source: HashMap<String, Vec<Arc<StyleRule>>>,
    diagnostics: Vec<StyleDiagnostic>,
}

impl Styler {
    /// The dark style bundled with the crate
    pub fn embedded() -> Result<Self, StyleError> {
        Self::from_json(EMBEDDED_STYLE)
    }

    pub fn from_path(path: &Path) -> Result<Self, StyleError> {
        let mut bytes = std::fs::read(path)?;
        Self::from_slice(&mut bytes)
    }

    pub fn from_json(json: &str) -> Result<Self, StyleError> {
        let mut bytes = json.as_bytes().to_vec();
        Self::from_slice(&mut bytes)
    }

    /// Parse and compile a style document. The buffer is used as scratch space by the parser.
    pub fn from_slice(bytes: &mut [u8]) -> Result<Self, StyleError> {
        let OwnedValue::Object(mut doc) = simd_json::to_owned_value(bytes)? else {
            return Err(StyleError::MissingLayers);
        };

        let name = doc
            .get("name")
            .and_then(non_empty_str)
            .unwrap_or_default();

        let constants: HashMap<String, OwnedValue> = match doc.get("constants") {
            Some(OwnedValue::Object(obj)) => obj
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            _ => HashMap::new(),
        };

        let Some(OwnedValue::Array(mut layers)) = doc.remove("layers") else {
            return Err(StyleError::MissingLayers);
        };

        let mut styler = Self {
            name,
            rules_by_source: HashMap::new(),
            diagnostics: Vec::new(),
        };
        let mut resolved: HashMap<String, RawLayer> = HashMap::new();

        for (index, layer) in layers.iter_mut().enumerate() {
            substitute_constants(layer, &constants);

            let Some(raw) = RawLayer::parse(layer) else {
                styler.record(StyleDiagnostic::InvalidLayer { index });
                continue;
            };

            let raw = match raw.reference.clone() {
                Some(reference) => match resolved.get(&reference) {
                    Some(parent) => raw.inherit(parent),
                    None => {
                        styler.record(StyleDiagnostic::UnknownRef {
                            layer_id: raw.id.clone(),
                            reference,
                        });
                        raw
                    }
                },
                None => raw,
            };

            resolved.insert(raw.id.clone(), raw.clone());
            styler.register(raw);
        }

        debug!(
            style = %styler.name,
            rules = styler.rule_count(),
            diagnostics = styler.diagnostics.len(),
            "style compiled"
        );
        Ok(styler)
    }

    fn register(&mut self, raw: RawLayer) {
        if raw.hidden() {
            debug!(layer = %raw.id, "layer hidden by layout.visibility");
            return;
        }
        let Some(source_layer) = raw.source_layer.clone() else {
            debug!(layer = %raw.id, "layer has no source-layer, not registered");
            return;
        };

        let filter = match raw.filter.as_ref().map(Filter::compile) {
            None => Filter::Always,
            Some(Ok(filter)) => filter,
            Some(Err(error)) => {
                self.record(StyleDiagnostic::InvalidFilter {
                    layer_id: raw.id.clone(),
                    error,
                });
                Filter::Never
            }
        };

        let rule = StyleRule {
            id: raw.id,
            kind: LayerKind::parse(raw.kind.as_deref().unwrap_or_default()),
            source_layer: source_layer.clone(),
            min_zoom: raw.min_zoom.unwrap_or(0.0),
            max_zoom: raw.max_zoom.unwrap_or(0.0),
            paint: raw.paint.unwrap_or_default(),
            layout: raw.layout.unwrap_or_default(),
            filter,
        };
        self.rules_by_source
            .entry(source_layer)
            .or_default()
            .push(Arc::new(rule));
    }

    fn record(&mut self, diagnostic: StyleDiagnostic) {
        warn!(?diagnostic, "style layer degraded");
        self.diagnostics.push(diagnostic);
    }

    /// First rule registered for `source_layer` whose filter accepts `props`.
    pub fn style_for(&self, source_layer: &str, props: &Properties) -> Option<&Arc<StyleRule>> {
        self.rules_by_source
            .get(source_layer)?
            .iter()
            .find(|rule| rule.matches(props))
    }

    /// Rules for a source layer in document order
    pub fn rules_for(&self, source_layer: &str) -> &[Arc<StyleRule>] {
        self.rules_by_source
            .get(source_layer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn diagnostics(&self) -> &[StyleDiagnostic] {
        &self.diagnostics
    }

    pub fn rule_count(&self) -> usize {
        self.rules_by_source.values().map(Vec::len).sum()
    }
}

/// Replace every `@name` string with the constant of that name, at any depth.
fn substitute_constants(value: &mut OwnedValue, constants: &HashMap<String, OwnedValue>) {
    let replacement = match value {
        OwnedValue::String(s) if s.starts_with('@') => constants.get(s.as_str()).cloned(),
        OwnedValue::Array(items) => {
            for item in items.iter_mut() {
                substitute_constants(item, constants);
            }
            None
        }
        OwnedValue::Object(obj) => {
            for (_, item) in obj.iter_mut() {
                substitute_constants(item, constants);
            }
            None
        }
        _ => None,
    };
    if let Some(replacement) = replacement {
        *value = replacement;
    }
}

fn field<'a>(value: &'a OwnedValue, key: &str) -> Option<&'a OwnedValue> {
    match value {
        OwnedValue::Object(obj) => obj.get(key),
        _ => None,
    }
}

fn non_empty_str(value: &OwnedValue) -> Option<String> {
    match value {
        OwnedValue::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn number(value: &OwnedValue) -> Option<f64> {
    PropertyValue::from_json(value)?.as_number()
}

fn string_map(value: &OwnedValue) -> HashMap<String, String> {
    match value {
        OwnedValue::Object(obj) => obj
            .iter()
            .filter_map(|(k, v)| match v {
                OwnedValue::String(s) => Some((k.to_string(), s.clone())),
                _ => None,
            })
            .collect(),
        _ => HashMap::new(),
    }
}
