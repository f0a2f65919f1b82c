//! Follow-up update through the XML API for profile fields the JSON API cannot set.

use quick_xml::Reader;
use quick_xml::events::Event;
use url::Url;
use url::form_urlencoded::byte_serialize;

use super::error::{ImportError, ImportResult};
use super::headers::{APPLICATION_PURPOSE, DEPLOYMENT_METHOD, INDUSTRY, ORIGIN};
use super::row::Row;
use crate::traits::{ContentType, HttpClient, Output};

const UPDATE_APP_PATH: &str = "api/5.0/updateapp.do";

/// Whether the legacy update was needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyUpdate {
    Skipped,
    Applied,
}

/// Fields only the XML API can set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyFields {
    pub origin: Option<String>,
    pub industry: Option<String>,
    pub application_purpose: Option<String>,
    pub deployment_method: Option<String>,
}

impl LegacyFields {
    pub fn from_row(row: &Row) -> Self {
        Self {
            origin: row.text(ORIGIN),
            industry: row.text(INDUSTRY),
            application_purpose: row.text(APPLICATION_PURPOSE),
            deployment_method: row.text(DEPLOYMENT_METHOD),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters().is_empty()
    }

    fn parameters(&self) -> Vec<(&'static str, &str)> {
        [
            ("origin", &self.origin),
            ("industry", &self.industry),
            ("app_type", &self.application_purpose),
            ("deployment_method", &self.deployment_method),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key, value)))
        .collect()
    }

    /// `updateapp.do` URL for application `app_id`
    pub fn update_url(&self, legacy_base: &Url, app_id: &str) -> ImportResult<Url> {
        let mut url = legacy_base.join(UPDATE_APP_PATH).map_err(|e| {
            ImportError::MalformedResponse(format!("invalid legacy URL: {}", e))
        })?;

        let mut query = format!("app_id={}", encode_value(app_id));
        for (key, value) in self.parameters() {
            query.push('&');
            query.push_str(key);
            query.push('=');
            query.push_str(&encode_value(value));
        }
        url.set_query(Some(&query));

        Ok(url)
    }
}

/// Form-encode a query value: spaces become `+`, `&` becomes `%26`.
///
/// Only alphanumerics and `*-._` stay literal, so `~` is sent as `%7E`;
/// servers decode either spelling to the same value.
pub fn encode_value(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect::<String>()
}

/// Text of a root `<error>` element, if the document is one
pub fn error_message(body: &str) -> ImportResult<Option<String>> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut in_error = false;
    let mut message = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) if !in_error => {
                if element.name().as_ref() != b"error" {
                    return Ok(None);
                }
                in_error = true;
            }
            Event::Empty(_) if !in_error => return Ok(None),
            Event::Text(text) if in_error => {
                let text = text
                    .unescape()
                    .map_err(|e| ImportError::MalformedResponse(e.to_string()))?;
                message.push_str(&text);
            }
            Event::CData(data) if in_error => {
                message.push_str(&String::from_utf8_lossy(&data.into_inner()));
            }
            Event::End(_) if in_error => break,
            Event::Eof => break,
            _ => {}
        }
    }

    let message = message.trim();
    if message.is_empty() {
        Ok(None)
    } else {
        Ok(Some(message.to_string()))
    }
}

/// Applies `LegacyFields` to an existing application
pub struct LegacyUpdater<'a> {
    http: &'a dyn HttpClient,
    output: &'a dyn Output,
    legacy_base: &'a Url,
    verbose: bool,
}

impl<'a> LegacyUpdater<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        output: &'a dyn Output,
        legacy_base: &'a Url,
        verbose: bool,
    ) -> Self {
        Self {
            http,
            output,
            legacy_base,
            verbose,
        }
    }

    pub fn update(&self, app_id: &str, fields: &LegacyFields) -> ImportResult<LegacyUpdate> {
        if fields.is_empty() {
            return Ok(LegacyUpdate::Skipped);
        }

        self.output.info("Setting xml-only values");
        let url = fields.update_url(self.legacy_base, app_id)?;
        if self.verbose {
            self.output.debug(&format!("Calling: {}", url));
        }

        let response = self
            .http
            .get(&url, ContentType::Xml)
            .map_err(ImportError::Transport)?;

        if self.verbose {
            self.output.debug(&format!("status code {}", response.status));
            if !response.body.is_empty() {
                self.output.debug(&response.body);
            }
        }

        if !response.is_success() {
            return Err(ImportError::LegacyUpdate(response.status.to_string()));
        }

        match error_message(&response.body)? {
            Some(message) => Err(ImportError::LegacyUpdate(message)),
            None => {
                self.output.success("Successfully updated xml-only fields.");
                Ok(LegacyUpdate::Applied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockHttpClient, MockOutput};

    fn legacy_base() -> Url {
        Url::parse("https://analysiscenter.veracode.com/").unwrap()
    }

    #[test]
    fn test_encode_value() {
        assert_eq!(encode_value("Third Party"), "Third+Party");
        assert_eq!(encode_value("R&D"), "R%26D");
        assert_eq!(encode_value("a=b/c"), "a%3Db%2Fc");
    }

    #[test]
    fn test_encode_value_unreserved_marks() {
        assert_eq!(encode_value("a*b"), "a*b");
        assert_eq!(encode_value("a~b"), "a%7Eb");
        assert_eq!(encode_value("v1.2_x-y"), "v1.2_x-y");
    }

    #[test]
    fn test_update_url_only_carries_present_fields() {
        let fields = LegacyFields {
            origin: Some("Third Party".to_string()),
            industry: None,
            application_purpose: Some("Internal & External".to_string()),
            deployment_method: None,
        };

        let url = fields.update_url(&legacy_base(), "12345").unwrap();

        assert_eq!(
            url.as_str(),
            "https://analysiscenter.veracode.com/api/5.0/updateapp.do?app_id=12345&origin=Third+Party&app_type=Internal+%26+External"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message("<?xml version=\"1.0\"?>\n<error>App not found</error>").unwrap(),
            Some("App not found".to_string())
        );
        assert_eq!(
            error_message("<error>Bad &amp; worse</error>").unwrap(),
            Some("Bad & worse".to_string())
        );
        assert_eq!(error_message("<error></error>").unwrap(), None);
        assert_eq!(error_message("<error/>").unwrap(), None);
        assert_eq!(
            error_message("<appinfo><application app_id=\"1\"/></appinfo>").unwrap(),
            None
        );
    }

    #[test]
    fn test_no_fields_means_no_call() {
        let http = MockHttpClient::new();
        let output = MockOutput::new();
        let base = legacy_base();
        let updater = LegacyUpdater::new(&http, &output, &base, false);

        let result = updater.update("1", &LegacyFields::default()).unwrap();

        assert_eq!(result, LegacyUpdate::Skipped);
        assert!(http.calls().is_empty());
    }

    #[test]
    fn test_error_element_fails_update() {
        let http = MockHttpClient::new();
        http.respond("updateapp.do", 200, "<error>Invalid industry</error>");
        let output = MockOutput::new();
        let base = legacy_base();
        let updater = LegacyUpdater::new(&http, &output, &base, false);
        let fields = LegacyFields {
            industry: Some("Space".to_string()),
            ..LegacyFields::default()
        };

        let error = updater.update("1", &fields).unwrap_err();

        assert_eq!(
            error.to_string(),
            "ERROR: Unable to add xml-only fields to application: Invalid industry"
        );
    }

    #[test]
    fn test_non_success_status_fails_update() {
        let http = MockHttpClient::new();
        http.respond("updateapp.do", 401, "");
        let output = MockOutput::new();
        let base = legacy_base();
        let updater = LegacyUpdater::new(&http, &output, &base, false);
        let fields = LegacyFields {
            origin: Some("Vendor".to_string()),
            ..LegacyFields::default()
        };

        let error = updater.update("1", &fields).unwrap_err();

        assert_eq!(
            error.to_string(),
            "ERROR: Unable to add xml-only fields to application: 401"
        );
    }

    #[test]
    fn test_successful_update() {
        let http = MockHttpClient::new();
        http.respond(
            "updateapp.do",
            200,
            "<?xml version=\"1.0\"?><appinfo><application app_id=\"1\"/></appinfo>",
        );
        let output = MockOutput::new();
        let base = legacy_base();
        let updater = LegacyUpdater::new(&http, &output, &base, false);
        let fields = LegacyFields {
            deployment_method: Some("Web Application".to_string()),
            ..LegacyFields::default()
        };

        assert_eq!(updater.update("1", &fields).unwrap(), LegacyUpdate::Applied);
        assert_eq!(http.calls()[0].method, "GET");
    }
}
