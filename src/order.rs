use crate::lookup::LookupTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns of the order export, in output order.
///
/// The first seven are captured by the order form. The rest are part of the
/// import schema but this flow always leaves them empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    OrderDate,
    BusinessPartner,
    DocumentType,
    Warehouse,
    ProductCode,
    Description,
    Quantity,
    CustomerReference,
    DeliveryDate,
    PostingDate,
    SalesEmployee,
    PaymentTerms,
    ShipTo,
    BillTo,
    Currency,
    UnitPrice,
    DiscountPercent,
    TaxCode,
    Project,
    CostCenter,
    Remarks,
}

impl Column {
    pub const ALL: [Column; 21] = [
        Column::OrderDate,
        Column::BusinessPartner,
        Column::DocumentType,
        Column::Warehouse,
        Column::ProductCode,
        Column::Description,
        Column::Quantity,
        Column::CustomerReference,
        Column::DeliveryDate,
        Column::PostingDate,
        Column::SalesEmployee,
        Column::PaymentTerms,
        Column::ShipTo,
        Column::BillTo,
        Column::Currency,
        Column::UnitPrice,
        Column::DiscountPercent,
        Column::TaxCode,
        Column::Project,
        Column::CostCenter,
        Column::Remarks,
    ];

    /// Header text written to the export.
    pub fn header(self) -> &'static str {
        match self {
            Column::OrderDate => "Order Date",
            Column::BusinessPartner => "Business Partner",
            Column::DocumentType => "Document Type",
            Column::Warehouse => "Warehouse",
            Column::ProductCode => "Product Code",
            Column::Description => "Description",
            Column::Quantity => "Quantity",
            Column::CustomerReference => "Customer Reference",
            Column::DeliveryDate => "Delivery Date",
            Column::PostingDate => "Posting Date",
            Column::SalesEmployee => "Sales Employee",
            Column::PaymentTerms => "Payment Terms",
            Column::ShipTo => "Ship To",
            Column::BillTo => "Bill To",
            Column::Currency => "Currency",
            Column::UnitPrice => "Unit Price",
            Column::DiscountPercent => "Discount Percent",
            Column::TaxCode => "Tax Code",
            Column::Project => "Project",
            Column::CostCenter => "Cost Center",
            Column::Remarks => "Remarks",
        }
    }

    pub fn headers() -> Vec<&'static str> {
        Column::ALL.iter().map(|c| c.header()).collect()
    }
}

/// A pending product/quantity entry that has not been submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    description: String,
    quantity: u32,
    product_code: String,
}

impl LineItem {
    pub fn blank() -> Self {
        LineItem {
            description: String::new(),
            quantity: 1,
            product_code: String::new(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Always the lookup code of the current description, or empty.
    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    pub(crate) fn set_description(&mut self, description: String, lookup: &LookupTable) {
        self.product_code = lookup
            .product_code(&description)
            .unwrap_or_default()
            .to_string();
        self.description = description;
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

impl Default for LineItem {
    fn default() -> Self {
        LineItem::blank()
    }
}

/// Order-level fields shared by every row of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub business_partner: String,
    pub order_date: NaiveDate,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub warehouse: String,
}

/// Header values applied when a submission does not provide them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDefaults {
    pub document_type: String,
    pub warehouse: String,
}

impl OrderDefaults {
    pub fn header(&self, business_partner: &str, order_date: NaiveDate) -> OrderHeader {
        OrderHeader {
            business_partner: business_partner.to_string(),
            order_date,
            document_type: self.document_type.clone(),
            warehouse: self.warehouse.clone(),
        }
    }
}

/// A submitted record: one line item combined with its batch header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRow {
    pub description: String,
    pub product_code: String,
    pub quantity: u32,
    pub header: OrderHeader,
    /// Values for the placeholder columns; empty in this flow.
    pub placeholders: BTreeMap<Column, String>,
}

impl OrderRow {
    pub fn new(item: &LineItem, header: &OrderHeader) -> Self {
        OrderRow {
            description: item.description.clone(),
            product_code: item.product_code.clone(),
            quantity: item.quantity,
            header: header.clone(),
            placeholders: BTreeMap::new(),
        }
    }

    /// Text value of one column as it appears in the export.
    pub fn value(&self, column: Column) -> String {
        match column {
            Column::OrderDate => self.header.order_date.format("%Y-%m-%d").to_string(),
            Column::BusinessPartner => self.header.business_partner.clone(),
            Column::DocumentType => self.header.document_type.clone(),
            Column::Warehouse => self.header.warehouse.clone(),
            Column::ProductCode => self.product_code.clone(),
            Column::Description => self.description.clone(),
            Column::Quantity => self.quantity.to_string(),
            other => self.placeholders.get(&other).cloned().unwrap_or_default(),
        }
    }

    /// All column values in export order.
    pub fn values(&self) -> Vec<String> {
        Column::ALL.iter().map(|&c| self.value(c)).collect()
    }
}

/// Submitted rows in insertion order. Rows are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderTable {
    rows: Vec<OrderRow>,
}

impl OrderTable {
    pub fn new() -> Self {
        OrderTable::default()
    }

    pub fn push(&mut self, row: OrderRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[OrderRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
