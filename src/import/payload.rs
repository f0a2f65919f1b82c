use serde::Serialize;

/// Body of the application creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationRequest {
    pub profile: ApplicationProfile,
}

/// Profile of the application to create; optional parts are left out when empty
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationProfile {
    pub name: String,
    pub description: String,
    pub tags: String,
    pub business_criticality: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub archer_app_name: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub business_owners: Vec<BusinessOwner>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_unit: Option<GuidRef>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<GuidRef>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<GuidRef>,

    pub settings: ProfileSettings,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessOwner {
    pub email: String,
    pub name: String,
}

/// Reference to another resource by identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuidRef {
    pub guid: String,
}

impl GuidRef {
    pub fn new(guid: String) -> Self {
        Self { guid }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileSettings {
    pub dynamic_scan_approval_not_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomField {
    pub name: String,
    pub value: String,
}
