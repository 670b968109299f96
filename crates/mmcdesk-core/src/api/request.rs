//! Description of an outbound API call.
//!
//! An [`ApiRequest`] is a plain value the gateway can turn into a
//! `reqwest` request any number of times, which is what lets a call be
//! replayed after a token refresh.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};

use super::ApiError;

/// Routing fields for calls tunnelled through the fixed-shape proxy
/// endpoint: the real path and method travel in the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyParams {
    pub target_path: String,
    pub actual_method: String,
}

impl ProxyParams {
    pub fn new(target_path: impl Into<String>, actual_method: &Method) -> Self {
        Self {
            target_path: target_path.into(),
            actual_method: actual_method.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text(String),
    File {
        bytes: Vec<u8>,
        file_name: String,
        mime: Option<String>,
    },
}

/// Multipart body that can be rebuilt for every send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    parts: Vec<(String, FormPart)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_text(name, value);
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: Option<&str>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                bytes,
                file_name: file_name.into(),
                mime: mime.map(str::to_string),
            },
        ));
        self
    }

    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push((name.into(), FormPart::Text(value.into())));
    }

    pub fn parts(&self) -> &[(String, FormPart)] {
        &self.parts
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|(n, part)| match part {
            FormPart::Text(value) if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn to_multipart(&self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, part) in &self.parts {
            form = match part {
                FormPart::Text(value) => form.text(name.clone(), value.clone()),
                FormPart::File { bytes, file_name, mime } => {
                    let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file
                            .mime_str(mime)
                            .map_err(|e| ApiError::InvalidRequest(format!("Bad MIME type {}: {}", mime, e)))?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Form(FormData),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub proxy: Option<ProxyParams>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            proxy: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, ApiError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidRequest(format!("Bad {} header: {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Body is not serializable: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn form(mut self, form: FormData) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    pub fn proxy(mut self, proxy: ProxyParams) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Body as it goes on the wire, after proxy rewriting.
    ///
    /// With proxy params and a body: a multipart body gains `targetPath`
    /// and `actualMethod` fields; any other body is wrapped as
    /// `{ request: <proxy params>, body: <body> }`. Without a body the
    /// proxy params are ignored.
    pub fn wire_body(&self) -> RequestBody {
        let Some(proxy) = &self.proxy else {
            return self.body.clone();
        };
        match &self.body {
            RequestBody::Empty => RequestBody::Empty,
            RequestBody::Form(form) => {
                let mut form = form.clone();
                form.append_text("targetPath", proxy.target_path.clone());
                form.append_text("actualMethod", proxy.actual_method.clone());
                RequestBody::Form(form)
            }
            RequestBody::Json(body) => RequestBody::Json(json!({
                "request": proxy,
                "body": body,
            })),
        }
    }

    /// Whether the JSON content type must override any caller header.
    pub fn forces_json(&self) -> bool {
        self.proxy.is_some() && matches!(self.body, RequestBody::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;

    #[test]
    fn test_plain_body_is_untouched() {
        let req = ApiRequest::post("/api/v1/customers")
            .json(&json!({ "email": "a@x.io" }))
            .unwrap();
        assert_eq!(req.wire_body(), RequestBody::Json(json!({ "email": "a@x.io" })));
        assert!(!req.forces_json());
    }

    #[test]
    fn test_proxy_wraps_json_body() {
        let req = ApiRequest::post("/api/proxy")
            .header(CONTENT_TYPE, "text/plain")
            .unwrap()
            .json(&json!({ "name": "Fund A" }))
            .unwrap()
            .proxy(ProxyParams::new("/products/42", &Method::PUT));

        assert_eq!(
            req.wire_body(),
            RequestBody::Json(json!({
                "request": { "targetPath": "/products/42", "actualMethod": "PUT" },
                "body": { "name": "Fund A" },
            }))
        );
        assert!(req.forces_json());
        // The caller's description is left intact for replays
        assert_eq!(req.body, RequestBody::Json(json!({ "name": "Fund A" })));
    }

    #[test]
    fn test_proxy_appends_form_fields() {
        let form = FormData::new()
            .text("kind", "customers")
            .file("file", "import.xlsx", vec![1, 2, 3], None);
        let req = ApiRequest::post("/api/proxy")
            .form(form)
            .proxy(ProxyParams::new("/customers/import", &Method::POST));

        let RequestBody::Form(wire) = req.wire_body() else {
            panic!("expected multipart body");
        };
        assert_eq!(wire.parts().len(), 4);
        assert_eq!(wire.text_value("targetPath"), Some("/customers/import"));
        assert_eq!(wire.text_value("actualMethod"), Some("POST"));
        assert!(!req.forces_json());
        assert!(wire.to_multipart().is_ok());
    }

    #[test]
    fn test_proxy_without_body_is_ignored() {
        let req = ApiRequest::get("/api/proxy").proxy(ProxyParams::new("/x", &Method::GET));
        assert_eq!(req.wire_body(), RequestBody::Empty);
        assert!(!req.forces_json());
    }

    #[test]
    fn test_bad_mime_is_rejected() {
        let form = FormData::new().file("file", "a.bin", vec![0], Some("not a mime"));
        assert!(matches!(form.to_multipart(), Err(ApiError::InvalidRequest(_))));
    }
}
