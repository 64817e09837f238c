//! Catalog dataset and resource documents (CKAN action API shapes).

use serde::Deserialize;

/// Envelope of every CKAN action response
#[derive(Debug, Deserialize)]
pub(crate) struct ActionResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<ActionError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionError {
    #[serde(rename = "__type")]
    pub kind: Option<String>,
    pub message: Option<String>,
}

impl ActionError {
    pub fn describe(&self) -> String {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => format!("{}: {}", kind, message),
            (Some(kind), None) => kind.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// A catalog dataset with its resources
#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Dataset {
    /// Find a resource by exact name
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// A downloadable file attached to a dataset
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub url: String,
}

impl Resource {
    /// Lower-cased file type, e.g. `shp` or `geojson`
    pub fn file_type(&self) -> String {
        self.format
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }

    /// File name to store a download under: last URL path segment, else the resource name
    pub fn file_name(&self) -> String {
        let from_url = url::Url::parse(&self.url).ok().and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
                .filter(|s| !s.is_empty())
        });
        let name = from_url.unwrap_or_else(|| self.name.clone());
        sanitize_file_name(&name)
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "resource".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_show() {
        let body = r#"{
            "success": true,
            "result": {
                "id": "abc",
                "name": "cod-ab-afg",
                "title": "Afghanistan - Subnational Administrative Boundaries",
                "resources": [
                    {"id": "r1", "name": "afg_adm_agcho_20211117_shp.zip", "format": "SHP",
                     "url": "https://data.example.org/dataset/abc/resource/r1/download/afg_adm_shp.zip"},
                    {"id": "r2", "name": "afg_adm_gdb.zip", "format": "Geodatabase", "url": ""}
                ]
            }
        }"#;
        let response: ActionResponse<Dataset> = serde_json::from_str(body).unwrap();
        assert!(response.success);
        let dataset = response.result.unwrap();
        assert_eq!(dataset.resources.len(), 2);
        assert_eq!(dataset.resources[0].file_type(), "shp");
        assert_eq!(dataset.resources[0].file_name(), "afg_adm_shp.zip");
        assert_eq!(dataset.resources[1].file_name(), "afg_adm_gdb.zip");
        assert!(dataset.resource("afg_adm_gdb.zip").is_some());
    }

    #[test]
    fn test_parse_error_envelope() {
        let body = r#"{"success": false, "error": {"__type": "Not Found Error", "message": "Not found"}}"#;
        let response: ActionResponse<Dataset> = serde_json::from_str(body).unwrap();
        assert!(!response.success);
        assert_eq!(
            response.error.unwrap().describe(),
            "Not Found Error: Not found"
        );
    }

    #[test]
    fn test_file_name_is_sanitized() {
        let resource = Resource {
            id: "r".into(),
            name: "../evil name.zip".into(),
            format: None,
            url: String::new(),
        };
        assert_eq!(resource.file_name(), ".._evil_name.zip");
    }
}
