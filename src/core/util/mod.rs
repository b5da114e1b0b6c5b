pub mod cost_util;
