//! Tool-level metadata and execution log records.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::document::Element;

/// Optional descriptive fields of a tool.
///
/// `docurl` and `category` are stored as attributes of the `tool` element;
/// the remaining fields become text children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolMetadata {
    pub docurl: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub manual: Option<String>,
    pub executable_name: Option<String>,
    pub executable_path: Option<String>,
}

impl ToolMetadata {
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_docurl(mut self, docurl: &str) -> Self {
        self.docurl = Some(docurl.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_manual(mut self, manual: &str) -> Self {
        self.manual = Some(manual.to_string());
        self
    }

    pub fn with_executable(mut self, name: &str, path: Option<&str>) -> Self {
        self.executable_name = Some(name.to_string());
        self.executable_path = path.map(str::to_string);
        self
    }

    /// Text-valued fields paired with their element names, in document order.
    pub(crate) fn text_fields(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("manual", self.manual.as_deref()),
            ("description", self.description.as_deref()),
            ("executableName", self.executable_name.as_deref()),
            ("executablePath", self.executable_path.as_deref()),
        ]
    }

    pub(crate) fn from_tool_element(tool: &Element) -> Self {
        let text = |tag: &str| tool.find(tag).and_then(|e| e.text.clone());
        Self {
            docurl: tool.attr("docurl").map(str::to_string),
            category: tool.attr("category").map(str::to_string),
            description: text("description"),
            manual: text("manual"),
            executable_name: text("executableName"),
            executable_path: text("executablePath"),
        }
    }
}

/// Record of one tool run, written as the `log` element of a document.
///
/// Timestamps are RFC 3339 strings.
///
/// # Examples
///
/// ```
/// use ctd_params_core::ExecutionLog;
///
/// let mut log = ExecutionLog::default();
/// log.mark_started();
/// log.mark_finished("0");
/// assert!(log.time_start.is_some());
/// assert_eq!(log.status.as_deref(), Some("0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLog {
    pub time_start: Option<String>,
    pub time_finish: Option<String>,
    pub status: Option<String>,
    pub output: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

impl ExecutionLog {
    /// Stamps `time_start` with the current UTC time.
    pub fn mark_started(&mut self) {
        self.time_start = Some(Utc::now().to_rfc3339());
    }

    /// Stamps `time_finish` and records the exit status.
    pub fn mark_finished(&mut self, status: &str) {
        self.time_finish = Some(Utc::now().to_rfc3339());
        self.status = Some(status.to_string());
    }

    /// `log` element: timestamps and status as attributes, streams as
    /// `executionMessage`, `executionWarning` and `executionError` children.
    pub fn to_document_node(&self) -> Element {
        let mut node = Element::new("log");
        for (key, value) in [
            ("executionTimeStart", &self.time_start),
            ("executionTimeStop", &self.time_finish),
            ("executionStatus", &self.status),
        ] {
            if let Some(value) = value {
                node.set_attr(key, value);
            }
        }
        for (tag, text) in [
            ("executionMessage", &self.output),
            ("executionWarning", &self.warning),
            ("executionError", &self.error),
        ] {
            if let Some(text) = text {
                node.push(Element::new(tag).with_text(text));
            }
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_node_only_carries_present_fields() {
        let log = ExecutionLog {
            status: Some("1".into()),
            error: Some("segfault".into()),
            ..Default::default()
        };
        let node = log.to_document_node();
        assert_eq!(node.attributes, vec![("executionStatus".to_string(), "1".to_string())]);
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].tag, "executionError");
        assert_eq!(node.children[0].text.as_deref(), Some("segfault"));
    }

    #[test]
    fn test_finish_is_not_before_start() {
        let mut log = ExecutionLog::default();
        log.mark_started();
        log.mark_finished("0");
        let start = chrono::DateTime::parse_from_rfc3339(log.time_start.as_deref().unwrap()).unwrap();
        let finish = chrono::DateTime::parse_from_rfc3339(log.time_finish.as_deref().unwrap()).unwrap();
        assert!(finish >= start);
    }

    #[test]
    fn test_metadata_reads_attributes_and_text_children() {
        let tool = Element::new("tool")
            .with_attr("docurl", "http://example.org")
            .with_child(Element::new("executableName").with_text("run.sh"));
        let metadata = ToolMetadata::from_tool_element(&tool);
        assert_eq!(metadata.docurl.as_deref(), Some("http://example.org"));
        assert_eq!(metadata.executable_name.as_deref(), Some("run.sh"));
        assert_eq!(metadata.category, None);
    }
}
