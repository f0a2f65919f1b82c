pub mod http;
pub mod output;
pub mod workbook;

pub use http::{ContentType, HttpClient, ReqwestHttpClient};
pub use output::{Output, TerminalOutput};
pub use workbook::{WorkbookStore, XlsxWorkbookStore};

#[cfg(test)]
pub use http::MockHttpClient;
#[cfg(test)]
pub use output::{MockOutput, OutputMessage};
#[cfg(test)]
pub use workbook::MemoryWorkbookStore;
