#![forbid(unsafe_code)]

//! Test harness for storelink.
//!
//! - [`TestStore`]: a reducer store with thunk middleware that records
//!   every action it receives.
//! - [`MockElement`]: a host element that records every operation.
//! - [`fixtures`]: counter and todo applications.
//! - [`strategies`]: `proptest` strategies for states, paths, and arrays.
//!
//! # Example
//!
//! ```
//! use storelink_harness::{MockElement, fixtures};
//! use storelink_runtime::Connector;
//!
//! let store = fixtures::counter_store(0);
//! let connector = Connector::new(store.clone()).unwrap();
//! let el = connector
//!     .augment(fixtures::counter_definition())
//!     .instantiate(MockElement::new("x-counter"));
//!
//! el.attach();
//! el.dispatch("increment").unwrap();
//! assert_eq!(el.element().borrow().get("count"), Some(&serde_json::json!(1)));
//! ```

pub mod element;
pub mod fixtures;
pub mod store;
pub mod strategies;

pub use element::{ElementOp, MockElement, fire};
pub use store::{Reducer, TestStore};
