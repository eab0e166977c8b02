//! Order Feed Module
//!
//! Client side of the external order feed:
//! - `parser`: validation of `SIDE,PRICE,QUANTITY,ID,TIMESTAMP` records
//! - `reader`: TCP connection with framed, time-bounded reads
//! - `intake`: the loop that moves parsed orders into the intake queue

pub mod intake;
pub mod parser;
pub mod reader;

pub use intake::{run_intake, IntakeExit, IntakePolicy, IntakeSummary, OrderSource};
pub use parser::parse_order;
pub use reader::OrderReader;
