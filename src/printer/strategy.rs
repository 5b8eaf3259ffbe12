//! # Render Strategies
//!
//! A [`RenderStrategy`] turns a job into the bytes of one device protocol.
//! The driver loop does not know about ESC/POS or ZPL; it asks the strategy
//! chosen for its device at startup.
//!
//! | Job | [`EscPosStrategy`] | [`ZplStrategy`] |
//! |-----|--------------------|-----------------|
//! | Receipt | compiled markup | unsupported |
//! | MarkupReceipt | compiled markup | unsupported |
//! | Label | unsupported | ZPL |
//! | CashDrawerOpen | drawer pulse | unsupported |
//! | StatusPrint | self-test receipt | self-test label |
//! | Probe | nothing | nothing |

use std::sync::Arc;

use chrono::Local;

use crate::error::{CompileFailure, RenderError};
use crate::markup::MarkupCompiler;
use crate::printer::{PrinterConfig, Protocol};
use crate::protocol::commands;
use crate::protocol::zpl::{FieldFont, LabelWriter, Orientation};
use crate::render::raster::RasterCache;
use crate::selftest::SelfTestInfo;
use crate::service::JobRequest;

/// Converts jobs into device bytes for one protocol.
pub trait RenderStrategy: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Render a job. An empty result means there is nothing to send.
    fn render(&self, request: &JobRequest) -> Result<Vec<u8>, RenderError>;

    fn unsupported(&self, request: &JobRequest) -> RenderError {
        RenderError::Unsupported {
            kind: request.kind(),
            protocol: self.protocol().name(),
        }
    }
}

/// Pick the strategy for a device profile.
pub fn for_printer(
    config: &PrinterConfig,
    images: Arc<RasterCache>,
    addresses: Vec<String>,
) -> Box<dyn RenderStrategy> {
    match config.protocol {
        Protocol::EscPos => Box::new(EscPosStrategy::new(config, images, addresses)),
        Protocol::Zpl => Box::new(ZplStrategy::new(config, addresses)),
    }
}

/// Receipt printers.
#[derive(Debug, Clone)]
pub struct EscPosStrategy {
    compiler: MarkupCompiler,
    device: String,
    addresses: Vec<String>,
}

impl EscPosStrategy {
    pub fn new(config: &PrinterConfig, images: Arc<RasterCache>, addresses: Vec<String>) -> Self {
        Self {
            compiler: MarkupCompiler::new(images).with_max_image_dots(config.width_dots),
            device: config.name.clone(),
            addresses,
        }
    }
}

impl RenderStrategy for EscPosStrategy {
    fn protocol(&self) -> Protocol {
        Protocol::EscPos
    }

    fn render(&self, request: &JobRequest) -> Result<Vec<u8>, RenderError> {
        let bytes = match request {
            JobRequest::Receipt(receipt) => receipt.render(&self.compiler)?,
            JobRequest::MarkupReceipt(markup) => self.compiler.compile_str(markup)?,
            JobRequest::CashDrawerOpen => {
                let mut out = commands::init();
                out.extend(commands::open_drawer());
                out
            }
            JobRequest::StatusPrint => {
                let page = SelfTestInfo::now(self.device.clone(), self.addresses.clone());
                self.compiler.compile(&page.to_document())?
            }
            JobRequest::Probe => Vec::new(),
            JobRequest::Label(_) => return Err(self.unsupported(request)),
        };
        Ok(bytes)
    }
}

/// Label printers.
#[derive(Debug, Clone)]
pub struct ZplStrategy {
    device: String,
    width_dots: u32,
    addresses: Vec<String>,
}

impl ZplStrategy {
    pub fn new(config: &PrinterConfig, addresses: Vec<String>) -> Self {
        Self {
            device: config.name.clone(),
            width_dots: config.width_dots,
            addresses,
        }
    }

    fn self_test_label(&self) -> Vec<u8> {
        let font = |height| FieldFont {
            height,
            width: 0,
            orientation: Orientation::Normal,
        };
        let mut zpl = LabelWriter::start();
        zpl.print_width(self.width_dots);

        let mut y = 20;
        zpl.text(20, y, font(40), None, "Printer Status");
        y += 60;
        let mut lines = vec![
            format!("VERSION: {}", env!("CARGO_PKG_VERSION")),
            format!("DEVICE: {}", self.device),
        ];
        if self.addresses.is_empty() {
            lines.push("ERROR: Could not connect to LAN.".to_string());
        } else {
            lines.extend(self.addresses.iter().cloned());
        }
        lines.push(Local::now().format("%d/%m/%Y %H:%M").to_string());
        for line in &lines {
            zpl.text(20, y, font(25), None, line);
            y += 35;
        }

        zpl.label_length(y + 20);
        zpl.finish()
    }
}

impl RenderStrategy for ZplStrategy {
    fn protocol(&self) -> Protocol {
        Protocol::Zpl
    }

    fn render(&self, request: &JobRequest) -> Result<Vec<u8>, RenderError> {
        match request {
            JobRequest::Label(label) => label.render().map_err(|error| {
                RenderError::Compile(CompileFailure {
                    error,
                    stub: Vec::new(),
                })
            }),
            JobRequest::StatusPrint => Ok(self.self_test_label()),
            JobRequest::Probe => Ok(Vec::new()),
            JobRequest::Receipt(_) | JobRequest::MarkupReceipt(_) | JobRequest::CashDrawerOpen => {
                Err(self.unsupported(request))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::label::LabelData;
    use crate::service::JobKind;

    fn escpos() -> EscPosStrategy {
        EscPosStrategy::new(
            &PrinterConfig::EPSON_TM_T20.config(),
            Arc::new(RasterCache::new()),
            vec!["http://10.0.0.2:8080".into()],
        )
    }

    fn zpl() -> ZplStrategy {
        ZplStrategy::new(&PrinterConfig::ZEBRA_GK420D.config(), Vec::new())
    }

    fn label() -> LabelData {
        serde_json::from_str(
            r#"{"width_dots": 200, "height_dots": 100,
                "fields": [{"type": "text", "x": 5, "y": 5, "data": "Hi"}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_escpos_markup() {
        let bytes = escpos()
            .render(&JobRequest::MarkupReceipt("<receipt>Hi</receipt>".into()))
            .unwrap();
        assert!(bytes.starts_with(&commands::init()));
        assert!(bytes.ends_with(&commands::cut_full_feed()));
    }

    #[test]
    fn test_escpos_drawer() {
        let bytes = escpos().render(&JobRequest::CashDrawerOpen).unwrap();
        let mut expected = commands::init();
        expected.extend(commands::open_drawer());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_escpos_self_test_mentions_device() {
        let bytes = escpos().render(&JobRequest::StatusPrint).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("DEVICE: Epson TM-T20"));
        assert!(text.contains("http://10.0.0.2:8080"));
    }

    #[test]
    fn test_escpos_rejects_label() {
        let err = escpos().render(&JobRequest::Label(label())).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Unsupported {
                kind: JobKind::Label,
                protocol: "ESC/POS"
            }
        ));
    }

    #[test]
    fn test_escpos_compile_failure_keeps_stub() {
        let err = escpos()
            .render(&JobRequest::MarkupReceipt("<receipt><blink/></receipt>".into()))
            .unwrap_err();
        let RenderError::Compile(failure) = err else {
            panic!("expected compile failure");
        };
        assert_eq!(
            failure.error,
            CompileError::UnsupportedElement("blink".into())
        );
        assert!(failure.stub.ends_with(&commands::cut_full_feed()));
    }

    #[test]
    fn test_zpl_label() {
        let bytes = zpl().render(&JobRequest::Label(label())).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("^XA"));
        assert!(text.contains("^FDHi^FS"));
        assert!(text.ends_with("^XZ\n"));
    }

    #[test]
    fn test_zpl_self_test_without_network() {
        let bytes = zpl().render(&JobRequest::StatusPrint).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Printer Status"));
        assert!(text.contains("DEVICE: Zebra GK420d"));
        assert!(text.contains("Could not connect to LAN"));
    }

    #[test]
    fn test_zpl_rejects_receipts() {
        for request in [
            JobRequest::MarkupReceipt("<receipt/>".into()),
            JobRequest::CashDrawerOpen,
        ] {
            assert!(matches!(
                zpl().render(&request),
                Err(RenderError::Unsupported { protocol: "ZPL", .. })
            ));
        }
    }

    #[test]
    fn test_probe_renders_nothing() {
        assert!(escpos().render(&JobRequest::Probe).unwrap().is_empty());
        assert!(zpl().render(&JobRequest::Probe).unwrap().is_empty());
    }
}
