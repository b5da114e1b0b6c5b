pub mod chargeback_run_request;
