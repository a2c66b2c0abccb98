use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    Query,
    Form,
    /// Field name observed in a structured (JSON) response body.
    ResponseDerived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamClass {
    SensitiveAuth,
    UserIdentifier,
    Authentication,
    PathLike,
    Identifier,
    Search,
    Filter,
    RedirectLike,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub classification: ParamClass,
    pub sensitivity: Sensitivity,
    /// Value seen at discovery time, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_value: Option<String>,
}

impl Parameter {
    /// Whether the parameter may receive attack payloads.
    ///
    /// Credential fields and response-derived names are recorded but never probed.
    pub fn is_injectable(&self) -> bool {
        self.classification != ParamClass::Authentication
            && self.sensitivity != Sensitivity::Critical
            && self.location != ParamLocation::ResponseDerived
    }

    pub fn numeric_sample(&self) -> Option<i64> {
        self.sample_value.as_deref().and_then(|v| v.trim().parse().ok())
    }
}
