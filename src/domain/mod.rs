pub mod chargeback;
