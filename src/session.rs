use crate::error::{ExportError, SessionError};
use crate::export;
use crate::lookup::LookupTable;
use crate::order::{LineItem, OrderDefaults, OrderHeader, OrderRow, OrderTable};
use chrono::NaiveDate;
use log::{debug, info};
use std::sync::Arc;

/// State of one user's order entry.
///
/// Every user action is a method on this object. Interface layers (the web
/// handlers, the CLI, tests) own one `OrderSession` per user and pass it
/// around explicitly.
#[derive(Debug, Clone)]
pub struct OrderSession {
    lookup: Arc<LookupTable>,
    defaults: OrderDefaults,
    line_items: Vec<LineItem>,
    orders: OrderTable,
}

impl OrderSession {
    pub fn new(lookup: Arc<LookupTable>, defaults: OrderDefaults) -> Self {
        OrderSession {
            lookup,
            defaults,
            line_items: Vec::new(),
            orders: OrderTable::new(),
        }
    }

    pub fn lookup(&self) -> &LookupTable {
        &self.lookup
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn orders(&self) -> &OrderTable {
        &self.orders
    }

    /// Append an empty line item with quantity 1 and return its index.
    pub fn add_blank_line_item(&mut self) -> usize {
        self.line_items.push(LineItem::blank());
        self.line_items.len() - 1
    }

    /// Set the description of a pending item and re-resolve its product code.
    pub fn set_line_item_description(
        &mut self,
        index: usize,
        description: impl Into<String>,
    ) -> Result<&LineItem, SessionError> {
        let len = self.line_items.len();
        let item = self
            .line_items
            .get_mut(index)
            .ok_or(SessionError::IndexOutOfRange { index, len })?;
        item.set_description(description.into(), &self.lookup);
        Ok(item)
    }

    pub fn set_line_item_quantity(
        &mut self,
        index: usize,
        quantity: i64,
    ) -> Result<&LineItem, SessionError> {
        let len = self.line_items.len();
        let item = self
            .line_items
            .get_mut(index)
            .ok_or(SessionError::IndexOutOfRange { index, len })?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|&q| q >= 1)
            .ok_or(SessionError::InvalidQuantity(quantity))?;
        item.set_quantity(quantity);
        Ok(item)
    }

    /// Submit every pending item under one header built from the configured
    /// defaults. Returns the number of rows appended.
    pub fn submit(
        &mut self,
        business_partner: &str,
        order_date: NaiveDate,
    ) -> Result<usize, SessionError> {
        let header = self.defaults.header(business_partner, order_date);
        self.submit_header(header)
    }

    /// Submit every pending item under an explicit header.
    ///
    /// The pending list is left as is, so submitting twice appends the same
    /// items twice.
    pub fn submit_header(&mut self, mut header: OrderHeader) -> Result<usize, SessionError> {
        header.business_partner = header.business_partner.trim().to_string();
        if header.business_partner.is_empty() {
            return Err(SessionError::Validation(
                "business partner is required".to_string(),
            ));
        }

        for item in &self.line_items {
            self.orders.push(OrderRow::new(item, &header));
        }

        let count = self.line_items.len();
        info!(
            "submitted {} line items for {} dated {}",
            count, header.business_partner, header.order_date
        );
        Ok(count)
    }

    /// Serialize the order table to CSV. Does not touch session state.
    pub fn export_csv(&self) -> Result<Vec<u8>, ExportError> {
        export::to_csv(&self.orders)
    }

    /// Drop all pending items and submitted rows.
    pub fn clear(&mut self) {
        debug!(
            "clearing session: {} pending, {} submitted",
            self.line_items.len(),
            self.orders.len()
        );
        self.line_items.clear();
        self.orders = OrderTable::new();
    }
}
