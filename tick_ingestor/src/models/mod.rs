pub mod bar;
pub mod page;
pub mod quote;
pub mod record;
pub mod trade;
pub mod work_unit;
