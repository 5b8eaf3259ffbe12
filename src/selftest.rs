//! # Self-Test Page
//!
//! The status page printed on request: engine version, the device the page
//! was printed on and where the engine can be reached. Building it needs no
//! device, so it always compiles.

use chrono::{DateTime, Local};

use crate::markup::{Node, Tag};

const LAN_HELP: &str = "Please check that the print server is correctly connected \
with a network cable, that the LAN is set up with DHCP, and that network \
addresses are available.";

/// Everything printed on the self-test page.
#[derive(Debug, Clone)]
pub struct SelfTestInfo {
    pub version: String,
    pub device: String,
    /// Homepage addresses, e.g. `http://192.168.1.20:8080`
    pub addresses: Vec<String>,
    pub printed_at: DateTime<Local>,
}

impl SelfTestInfo {
    /// Info for this build, stamped with the current time.
    pub fn now(device: impl Into<String>, addresses: Vec<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            device: device.into(),
            addresses,
            printed_at: Local::now(),
        }
    }

    pub fn to_document(&self) -> Node {
        let mut root = Node::new(Tag::Receipt)
            .with_attr("align", "center")
            .with_child(Node::new(Tag::Br))
            .with_child(Node::text_node(Tag::H1, "Printer Status"))
            .with_child(Node::text_node(Tag::P, format!("VERSION: {}", self.version)))
            .with_child(Node::text_node(Tag::P, format!("DEVICE: {}", self.device)))
            .with_child(Node::text_node(Tag::Pre, "_".repeat(32)))
            .with_child(Node::new(Tag::Br));

        if self.addresses.is_empty() {
            root = root
                .with_child(Node::text_node(Tag::P, "ERROR: Could not connect to LAN."))
                .with_child(Node::new(Tag::Br))
                .with_child(
                    Node::text_node(Tag::P, LAN_HELP)
                        .with_attr("align", "left")
                        .with_attr("width", "32"),
                );
        } else {
            root = root
                .with_child(Node::text_node(Tag::P, "Homepage Addresses:").with_attr("font", "b"))
                .with_child(Node::new(Tag::Br))
                .with_children(
                    self.addresses
                        .iter()
                        .map(|addr| Node::text_node(Tag::P, addr)),
                );
        }

        root.with_child(Node::new(Tag::Br)).with_child(Node::text_node(
            Tag::P,
            self.printed_at.format("%d/%m/%Y %H:%M").to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::MarkupCompiler;
    use chrono::TimeZone;

    fn info(addresses: Vec<String>) -> SelfTestInfo {
        SelfTestInfo {
            version: "1.2.3".into(),
            device: "Epson TM-T20".into(),
            addresses,
            printed_at: Local.with_ymd_and_hms(2024, 3, 5, 9, 7, 0).unwrap(),
        }
    }

    fn rendered(info: &SelfTestInfo) -> String {
        let bytes = MarkupCompiler::default().compile(&info.to_document()).unwrap();
        String::from_utf8_lossy(&bytes).to_string()
    }

    #[test]
    fn test_lists_addresses() {
        let text = rendered(&info(vec![
            "http://192.168.1.20:8080".into(),
            "http://10.0.0.4:8080".into(),
        ]));
        assert!(text.contains("VERSION: 1.2.3"));
        assert!(text.contains("DEVICE: Epson TM-T20"));
        assert!(text.contains("Homepage Addresses:"));
        assert!(text.contains("http://10.0.0.4:8080\n"));
        assert!(text.contains("05/03/2024 09:07"));
        assert!(!text.contains("ERROR"));
    }

    #[test]
    fn test_explains_missing_network() {
        let text = rendered(&info(Vec::new()));
        assert!(text.contains("ERROR: Could not connect to LAN."));
        assert!(text.contains("DHCP"));
    }

    #[test]
    fn test_page_is_pure() {
        let page = info(vec!["http://127.0.0.1:8080".into()]);
        assert_eq!(rendered(&page), rendered(&page));
    }

    #[test]
    fn test_now_uses_crate_version() {
        let page = SelfTestInfo::now("dev", Vec::new());
        assert_eq!(page.version, env!("CARGO_PKG_VERSION"));
    }
}
