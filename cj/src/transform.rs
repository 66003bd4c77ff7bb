//! Record transformation and exclusion filtering

use custstore::{Customer, CustomerStore, NewCustomer};
use eyre::{Context, Result};
use tracing::debug;

/// Maps source customers to the export shape, dropping customers whose
/// country is in the exclusion set.
pub struct Transformer<'a> {
    store: &'a CustomerStore,
}

impl<'a> Transformer<'a> {
    pub fn new(store: &'a CustomerStore) -> Self {
        Self { store }
    }

    /// Transform one customer, or return `None` when its country is
    /// excluded.
    ///
    /// The exclusion set is re-read from the store on every call, so
    /// membership reflects the table's state at the moment of
    /// transformation. Lookup errors abort the record's chunk.
    pub fn process(&self, customer: &Customer) -> Result<Option<NewCustomer>> {
        let excluded = self
            .store
            .excluded_countries()
            .context("Failed to load exclusion set")?;

        if excluded.contains(&customer.country) {
            debug!(country = %customer.country, "Dropped excluded customer");
            return Ok(None);
        }

        Ok(Some(NewCustomer::from_customer(customer)))
    }
}
