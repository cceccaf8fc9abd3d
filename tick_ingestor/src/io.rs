#[cfg(feature = "dataframe")]
pub mod dataframe;
pub mod sink;
