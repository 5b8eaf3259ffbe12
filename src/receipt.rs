//! # Structured Receipts
//!
//! Point-of-sale receipts sent as JSON data instead of markup. The data is
//! laid out as a [`Node`] tree and compiled by the same
//! [`MarkupCompiler`] as markup receipts, so both paths share styling,
//! line composition and value formatting.
//!
//! ## Layout
//!
//! ```text
//!               COMPANY NAME             (or the logo)
//!              contact, tel, vat
//!     --------------------------------
//!              Served by Alice
//!
//!   Coffee                          2.50
//!   Bagel
//!     2 x 1.75                      3.50
//!                                -------
//!   TOTAL                           6.00
//!
//!   Cash                           10.00
//!   CHANGE                          4.00
//!
//!   Order 00042-001-0001
//!   05/03/2024 09:07
//! ```

use serde::Deserialize;

use crate::error::CompileFailure;
use crate::markup::{MarkupCompiler, Node, Tag};

/// Column count used for receipt lines.
const RECEIPT_WIDTH: &str = "40";

/// Share of a line given to the description column.
const RECEIPT_LINE_RATIO: &str = "0.6";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Company {
    pub name: String,
    /// Logo as a base64 `data:` URL
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub contact_address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub vat: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderLine {
    pub product_name: String,
    /// Unit price
    pub price: f64,
    /// Line total as displayed
    pub price_display: f64,
    pub quantity: f64,
    /// Discount in percent
    #[serde(default)]
    pub discount: f64,
    #[serde(default = "default_unit")]
    pub unit_name: String,
}

fn default_unit() -> String {
    UNITS.to_string()
}

/// Unit name of items sold by count.
const UNITS: &str = "Unit(s)";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaxName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaxDetail {
    pub tax: TaxName,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentLine {
    pub journal: String,
    pub amount: f64,
}

/// Decimal places per kind of number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Precision {
    pub price: usize,
    pub money: usize,
    pub quantity: usize,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            price: 2,
            money: 2,
            quantity: 3,
        }
    }
}

/// Order date; `month` is zero based.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReceiptDate {
    pub year: i32,
    pub month: u32,
    pub date: u32,
    pub hour: u32,
    pub minute: u32,
}

impl ReceiptDate {
    /// `DD/MM/YYYY HH:MM`
    pub fn display(&self) -> String {
        format!(
            "{:02}/{:02}/{:04} {:02}:{:02}",
            self.date,
            self.month + 1,
            self.year,
            self.hour,
            self.minute
        )
    }
}

/// A point-of-sale receipt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReceiptData {
    pub company: Company,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub footer: Option<String>,
    #[serde(default)]
    pub cashier: Option<String>,
    #[serde(default)]
    pub orderlines: Vec<OrderLine>,
    pub subtotal: f64,
    pub total_with_tax: f64,
    #[serde(default)]
    pub total_discount: f64,
    #[serde(default)]
    pub tax_details: Vec<TaxDetail>,
    #[serde(default)]
    pub paymentlines: Vec<PaymentLine>,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: Option<ReceiptDate>,
}

impl ReceiptData {
    /// Lay the receipt out as a document tree.
    pub fn to_document(&self) -> Node {
        let mut doc = Document::new(&self.precision);

        // Header
        match present(&self.company.logo) {
            Some(logo) => doc.push(Node::new(Tag::Img).with_attr("src", logo)),
            None => doc.push(Node::text_node(Tag::H1, &self.company.name)),
        }
        let mut contact = Node::new(Tag::Div).with_attr("bold", "on");
        let contact_lines = [
            present(&self.company.contact_address).map(str::to_string),
            present(&self.company.phone).map(|p| format!("Tel:{}", p)),
            present(&self.company.vat).map(|v| format!("VAT:{}", v)),
            present(&self.company.email).map(str::to_string),
            present(&self.company.website).map(str::to_string),
            present(&self.header).map(str::to_string),
        ];
        for line in contact_lines.into_iter().flatten() {
            contact = contact.with_child(Node::text_node(Tag::P, line));
        }
        if let Some(cashier) = present(&self.cashier) {
            contact = contact
                .with_child(Node::text_node(Tag::Pre, "-".repeat(32)))
                .with_child(Node::text_node(Tag::P, format!("Served by {}", cashier)));
        }
        doc.push(contact);
        doc.blank(2);

        // Order lines
        for line in &self.orderlines {
            let total = doc.price(line.price_display);
            if line.discount == 0.0 && line.unit_name == UNITS && line.quantity == 1.0 {
                doc.push(doc.line(&line.product_name, Some(total), 0));
                continue;
            }
            doc.push(doc.line(&line.product_name, None, 0));
            if line.discount != 0.0 {
                let discount = format!("Discount: {}%", trim_number(line.discount));
                doc.push(doc.line(&discount, None, 1));
            }
            let unit = if line.unit_name == UNITS {
                String::new()
            } else {
                line.unit_name.clone()
            };
            let detail = format!(
                "{}{} x {}",
                self.quantity(line.quantity),
                unit,
                fixed(line.price, self.precision.price)
            );
            doc.push(doc.line(&detail, Some(total), 1));
        }

        // Subtotal and taxes, when taxes are added on top
        let taxes_included =
            fixed(self.subtotal, self.precision.money) == fixed(self.total_with_tax, self.precision.money);
        if !taxes_included {
            doc.push(doc.rule());
            doc.push(doc.line("Subtotal", Some(doc.money(self.subtotal)), 0));
            self.push_taxes(&mut doc);
        }

        // Total
        doc.push(doc.rule());
        doc.push(
            doc.line("TOTAL", Some(doc.money(self.total_with_tax)), 0)
                .with_attr("size", "double-height"),
        );
        doc.blank(2);

        // Payment
        for payment in &self.paymentlines {
            doc.push(doc.line(&payment.journal, Some(doc.money(payment.amount)), 0));
        }
        doc.blank(1);
        doc.push(
            doc.line("CHANGE", Some(doc.money(self.change)), 0)
                .with_attr("size", "double-height"),
        );
        doc.blank(1);

        if self.total_discount != 0.0 {
            doc.push(doc.line("Discounts", Some(doc.money(self.total_discount)), 0));
        }
        if taxes_included {
            self.push_taxes(&mut doc);
        }

        // Footer
        if let Some(footer) = present(&self.footer) {
            doc.blank(1);
            doc.push(Node::text_node(Tag::P, footer));
            doc.blank(1);
        }
        if !self.name.trim().is_empty() {
            doc.push(Node::text_node(Tag::P, &self.name));
        }
        if let Some(date) = &self.date {
            doc.push(Node::text_node(Tag::P, date.display()));
        }

        doc.finish()
    }

    /// Compile the receipt to ESC/POS bytes, ending with a cut.
    pub fn render(&self, compiler: &MarkupCompiler) -> Result<Vec<u8>, CompileFailure> {
        compiler.compile(&self.to_document())
    }

    fn push_taxes(&self, doc: &mut Document) {
        for tax in &self.tax_details {
            doc.push(doc.line(&tax.tax.name, Some(doc.price(tax.amount)), 0));
        }
    }

    /// Whole quantities print without decimals.
    fn quantity(&self, amount: f64) -> String {
        if amount.fract() == 0.0 {
            format!("{}", amount as i64)
        } else {
            fixed(amount, self.precision.quantity)
        }
    }
}

/// Receipt tree under construction.
struct Document {
    root: Node,
    price_decimals: String,
    money_decimals: String,
}

impl Document {
    fn new(precision: &Precision) -> Self {
        Self {
            root: Node::new(Tag::Receipt)
                .with_attr("align", "center")
                .with_attr("width", RECEIPT_WIDTH)
                .with_attr("line-ratio", RECEIPT_LINE_RATIO),
            price_decimals: precision.price.to_string(),
            money_decimals: precision.money.to_string(),
        }
    }

    fn push(&mut self, node: Node) {
        self.root.children.push(node);
    }

    fn blank(&mut self, lines: usize) {
        for _ in 0..lines {
            self.push(Node::new(Tag::Br));
        }
    }

    fn value(amount: f64, decimals: &str) -> Node {
        Node::text_node(Tag::Value, amount.to_string())
            .with_attr("value-decimals", decimals)
            .with_attr("value-thousands-separator", "")
    }

    fn price(&self, amount: f64) -> Node {
        Self::value(amount, &self.price_decimals)
    }

    fn money(&self, amount: f64) -> Node {
        Self::value(amount, &self.money_decimals)
    }

    fn line(&self, left: &str, right: Option<Node>, indent: usize) -> Node {
        let mut line = Node::new(Tag::Line)
            .with_attr("indent", indent.to_string())
            .with_child(Node::text_node(Tag::Left, left));
        if let Some(right) = right {
            line = line.with_child(Node::new(Tag::Right).with_child(right));
        }
        line
    }

    fn rule(&self) -> Node {
        self.line("", Some(Node::text_node(Tag::Span, "-------")), 0)
    }

    fn finish(self) -> Node {
        self.root
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn fixed(amount: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, amount)
}

fn trim_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
