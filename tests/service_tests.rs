//! # Service Tests
//!
//! End-to-end runs through [`PrinterService`] against in-memory devices:
//! what reaches the device, in which order, and what the status says.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use pretty_assertions::assert_eq;

use tillprint::label::LabelData;
use tillprint::markup::MarkupCompiler;
use tillprint::printer::PrinterConfig;
use tillprint::protocol::commands;
use tillprint::receipt::ReceiptData;
use tillprint::service::{
    DeviceState, DeviceStatus, JobRequest, PrintJob, PrinterService, ServiceConfig,
};
use tillprint::transport::MemoryTransport;

const WAIT: Duration = Duration::from_secs(10);

const MARKUP: &str = r#"<receipt>
    <h1>Corner Shop</h1>
    <line><left>Coffee</left><right><value value-symbol="$">2.5</value></right></line>
    <line><left>Bagel</left><right><value value-symbol="$">3</value></right></line>
    <hr/>
    <line size="double-height"><left>TOTAL</left><right><value value-symbol="$">5.5</value></right></line>
</receipt>"#;

fn service() -> PrinterService {
    service_polling(Duration::from_millis(2))
}

/// The next probe resets an error status to connected, so tests that read
/// error statuses poll slowly.
fn slow_service() -> PrinterService {
    service_polling(Duration::from_millis(500))
}

fn service_polling(poll_interval: Duration) -> PrinterService {
    PrinterService::new(ServiceConfig {
        poll_interval,
        addresses: vec!["http://192.168.1.20:8080".into()],
    })
}

fn with_till(device: &MemoryTransport) -> PrinterService {
    till(service(), device)
}

fn till(mut service: PrinterService, device: &MemoryTransport) -> PrinterService {
    service
        .add_printer(
            "till",
            PrinterConfig::EPSON_TM_T20.config(),
            Arc::new(device.clone()),
        )
        .unwrap();
    service
}

/// Poll until `check` holds or the deadline passes.
fn eventually(check: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

fn drawer_bytes() -> Vec<u8> {
    let mut bytes = commands::init();
    bytes.extend(commands::open_drawer());
    bytes
}

// ============================================================================
// OUTPUT
// ============================================================================

#[test]
fn test_markup_bytes_reach_device_unchanged() {
    let device = MemoryTransport::connected();
    let service = with_till(&device);

    service
        .submit("till", JobRequest::MarkupReceipt(MARKUP.into()))
        .unwrap();
    assert!(service.wait_idle(WAIT));

    let expected = MarkupCompiler::default().compile_str(MARKUP).unwrap();
    assert_eq!(device.written(), vec![expected]);
    assert_eq!(device.open_sessions(), 0);
}

#[test]
fn test_structured_receipt() {
    let json = r#"{
        "company": {"name": "Corner Shop", "phone": "555-0100"},
        "cashier": "Alice",
        "orderlines": [
            {"product_name": "Coffee", "price": 2.5, "price_display": 2.5, "quantity": 1},
            {"product_name": "Bagel", "price": 1.75, "price_display": 3.5, "quantity": 2}
        ],
        "subtotal": 6.0,
        "total_with_tax": 6.0,
        "paymentlines": [{"journal": "Cash", "amount": 10.0}],
        "change": 4.0,
        "name": "Order 00042-001-0001",
        "date": {"year": 2024, "month": 2, "date": 5, "hour": 9, "minute": 7}
    }"#;
    let receipt: ReceiptData = serde_json::from_str(json).unwrap();
    let expected = receipt.render(&MarkupCompiler::default()).unwrap();

    let device = MemoryTransport::connected();
    let service = with_till(&device);
    service.submit("till", JobRequest::Receipt(receipt)).unwrap();
    assert!(service.wait_idle(WAIT));

    let written = device.written();
    assert_eq!(written, vec![expected]);
    let text = String::from_utf8_lossy(&written[0]);
    assert!(text.contains("Served by Alice"));
    assert!(text.contains("05/03/2024 09:07"));
}

#[test]
fn test_jobs_print_in_submission_order() {
    let device = MemoryTransport::connected();
    let service = with_till(&device);

    for name in ["first", "second", "third"] {
        let markup = format!("<receipt><p>{}</p></receipt>", name);
        service
            .submit("till", JobRequest::MarkupReceipt(markup))
            .unwrap();
    }
    assert!(service.wait_idle(WAIT));

    let order: Vec<String> = device
        .written()
        .iter()
        .map(|bytes| {
            let text = String::from_utf8_lossy(bytes);
            ["first", "second", "third"]
                .into_iter()
                .find(|name| text.contains(name))
                .unwrap_or("?")
                .to_string()
        })
        .collect();
    assert_eq!(order, vec!["first", "second", "third"]);
}

#[test]
fn test_label_printer() {
    let device = MemoryTransport::connected();
    let mut service = service();
    service
        .add_printer(
            "labels",
            PrinterConfig::ZEBRA_GK420D.config(),
            Arc::new(device.clone()),
        )
        .unwrap();

    let label: LabelData = serde_json::from_str(
        r#"{"width_dots": 400, "height_dots": 200, "copies": 3,
            "fields": [{"type": "barcode", "kind": "code128", "x": 10, "y": 10, "data": "SKU-1"}]}"#,
    )
    .unwrap();
    service.submit("labels", JobRequest::Label(label)).unwrap();
    assert!(service.wait_idle(WAIT));

    let zpl = String::from_utf8(device.written().remove(0)).unwrap();
    assert!(zpl.starts_with("^XA"));
    assert!(zpl.contains("SKU-1"));
    assert!(zpl.ends_with("^PQ3\n^XZ\n"));
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_unplugged_printer_keeps_jobs_until_plugged_in() {
    let device = MemoryTransport::disconnected();
    let service = with_till(&device);
    let printer = service.printer("till").unwrap();

    printer.submit(JobRequest::MarkupReceipt(MARKUP.into()));
    assert!(eventually(|| printer.status().state == DeviceState::Disconnected));
    assert_eq!(
        printer.status(),
        DeviceStatus {
            state: DeviceState::Disconnected,
            messages: vec!["Printer Not Found".into()],
        }
    );
    assert_eq!(printer.outstanding(), 1);

    device.set_connected(true);
    assert!(printer.wait_idle(WAIT));
    assert_eq!(device.written().len(), 1);
    assert_eq!(printer.status().state, DeviceState::Connected);
    assert_eq!(
        printer.status().messages,
        vec!["Connected to Epson TM-T20".to_string()]
    );
}

#[test]
fn test_self_test_dropped_while_unplugged() {
    let device = MemoryTransport::disconnected();
    let service = with_till(&device);

    service.submit("till", JobRequest::StatusPrint).unwrap();
    assert!(service.wait_idle(WAIT));
    device.set_connected(true);
    assert!(eventually(|| service.status("till").unwrap().state == DeviceState::Connected));
    assert!(device.written().is_empty());
}

#[test]
fn test_stale_jobs_do_not_block_fresh_ones() {
    let device = MemoryTransport::connected();
    let service = with_till(&device);
    let printer = service.printer("till").unwrap();

    let two_hours_ago = Utc::now() - TimeDelta::hours(2);
    printer.submit_job(PrintJob::at(
        two_hours_ago,
        JobRequest::MarkupReceipt(MARKUP.into()),
    ));
    printer.submit_job(PrintJob::at(
        Utc::now() - TimeDelta::minutes(1),
        JobRequest::CashDrawerOpen,
    ));
    printer.submit(JobRequest::CashDrawerOpen);
    assert!(printer.wait_idle(WAIT));

    assert_eq!(device.written(), vec![drawer_bytes()]);
}

#[test]
fn test_io_fault_retries_same_job() {
    let device = MemoryTransport::connected();
    device.fail_next_write("endpoint stalled");
    let service = with_till(&device);

    service.submit("till", JobRequest::CashDrawerOpen).unwrap();
    assert!(service.wait_idle(WAIT));

    assert_eq!(device.written(), vec![drawer_bytes()]);
    assert_eq!(device.open_sessions(), 0);
}

#[test]
fn test_partial_write_is_reported_not_retried() {
    let device = MemoryTransport::connected();
    device.fail_next_write_with_short(10);
    let service = till(slow_service(), &device);

    service
        .submit("till", JobRequest::MarkupReceipt(MARKUP.into()))
        .unwrap();
    assert!(service.wait_idle(WAIT));

    let status = service.status("till").unwrap();
    assert_eq!(status.state, DeviceState::Error);
    assert!(
        status.messages[0].starts_with("A part of the ticket was not printed"),
        "{:?}",
        status
    );

    let written = device.written();
    assert_eq!(written.len(), 1);
    assert!(String::from_utf8_lossy(&written[0]).contains("ERROR PRINTER"));

    // probes keep running, but the receipt is never sent again
    let opens = device.open_count();
    assert!(eventually(|| device.open_count() > opens + 1));
    assert_eq!(device.written().len(), 1);
}

#[test]
fn test_broken_markup_prints_error_stub() {
    let device = MemoryTransport::connected();
    let service = till(slow_service(), &device);

    service
        .submit(
            "till",
            JobRequest::MarkupReceipt("<receipt><p>Hello</p><marquee/></receipt>".into()),
        )
        .unwrap();
    assert!(service.wait_idle(WAIT));

    let written = device.written();
    assert_eq!(written.len(), 1);
    assert!(written[0].ends_with(&commands::cut_full_feed()));
    let status = service.status("till").unwrap();
    assert_eq!(status.state, DeviceState::Error);
    assert_eq!(status.messages, vec!["Unsupported element <marquee>".to_string()]);
}

#[test]
fn test_hostile_markup_never_stops_the_worker() {
    let device = MemoryTransport::connected();
    let service = with_till(&device);

    let hostile = [
        "<receipt><value value-width=\"1000000000000000000\">1</value></receipt>".to_string(),
        "<receipt indent=\"9223372036854775807\"><line><left>a</left><right>b</right></line></receipt>"
            .to_string(),
        format!(
            "<receipt>{}deep{}</receipt>",
            "<b>".repeat(100_000),
            "</b>".repeat(100_000)
        ),
    ];
    for markup in hostile {
        service
            .submit("till", JobRequest::MarkupReceipt(markup))
            .unwrap();
    }
    service.submit("till", JobRequest::CashDrawerOpen).unwrap();
    assert!(service.wait_idle(WAIT));

    let written = device.written();
    assert_eq!(written.len(), 4);
    for bytes in &written[..3] {
        assert!(bytes.ends_with(&commands::cut_full_feed()));
    }
    assert!(String::from_utf8_lossy(&written[2]).contains("nested deeper than 64 levels"));
    assert_eq!(written[3], drawer_bytes());
}

#[test]
fn test_receipt_on_label_printer_is_dropped() {
    let device = MemoryTransport::connected();
    let mut service = slow_service();
    service
        .add_printer(
            "labels",
            PrinterConfig::ZEBRA_GK420D.config(),
            Arc::new(device.clone()),
        )
        .unwrap();

    service
        .submit("labels", JobRequest::MarkupReceipt(MARKUP.into()))
        .unwrap();
    assert!(service.wait_idle(WAIT));
    assert!(device.written().is_empty());
    assert_eq!(service.status("labels").unwrap().state, DeviceState::Error);
}

#[test]
fn test_shutdown_stops_probing() {
    let device = MemoryTransport::connected();
    let service = with_till(&device);
    service.submit("till", JobRequest::StatusPrint).unwrap();
    assert!(service.wait_idle(WAIT));

    service.shutdown();
    let opens = device.open_count();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(device.open_count(), opens);
}
