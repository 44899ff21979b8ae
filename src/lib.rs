/*!
# Order Desk

A small sales-order entry service, built in Rust.

## Overview

Users pick a business partner and an order date, compose line items
(product description plus quantity), and submit them into an order table.
The table can be downloaded as CSV or XLSX, or written to an output folder
and emailed as a CSV attachment through an SMTP relay.

## Architecture

### Reference data
- **Lookup Table** - partner names and a description → product code
  mapping, read once from a CSV dataset. A missing or unreadable dataset
  degrades to empty vocabularies with a warning.

### Core
- **Order Session** - one explicit object per user holding the pending line
  items and the submitted order table. Every user action is a method on it.
- **Order model** - line items, order headers, order rows and the fixed
  21-column export schema.

### Output
- **Export** - CSV/XLSX serialization, export file naming and scoped writes
- **Mailer** - SMTP delivery of the CSV with a fixed timeout
- **Uploads** - save uploaded files to an upload folder and list them

### Interfaces
- **Web app** (axum) - order form page plus a JSON API, keyed by a session
  cookie
- **CLI** - the same session commands from a terminal

## Modules

- **lookup**: dataset loading and vocabularies
- **order**: data model and column schema
- **session**: the per-user order session
- **export**: CSV/XLSX export and file output
- **mailer**: email delivery (web feature)
- **uploads**: upload folder handling (web feature)
- **config**: settings from defaults, TOML file and environment
- **error**: error types
- **app**: routing and handlers (web feature)

## REST API Endpoints

- `/api/lookup` - Partner and product vocabularies
- `/api/session` - Pending line items and submitted rows
- `/api/items`, `/api/items/{index}/description`, `/api/items/{index}/quantity` - Line item edits
- `/api/submit`, `/api/clear` - Submit pending items, reset the session
- `/api/export`, `/api/export/xlsx` - Downloads
- `/api/email` - Save the CSV and email it
- `/api/uploads` - Upload and list files
*/

pub mod config;
pub mod error;
pub mod export;
pub mod lookup;
pub mod order;
pub mod session;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod mailer;
#[cfg(feature = "web")]
pub mod uploads;

pub use config::Settings;
pub use error::{ExportError, LookupError, MailError, OrderError, SessionError, UploadError};
pub use lookup::{LookupColumns, LookupTable};
pub use order::{Column, LineItem, OrderDefaults, OrderHeader, OrderRow, OrderTable};
pub use session::OrderSession;
