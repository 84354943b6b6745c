use crate::{
    convert::ConvertError, field::FieldError, lookup::LookupError, plugmap::PlugMapError,
    yanny::ParError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid field selection")]
    Field(#[from] FieldError),
    #[error("failed to parse the yanny file")]
    Par(#[from] ParError),
    #[error("invalid lookup table")]
    Lookup(#[from] LookupError),
    #[error("inconsistent plug map")]
    PlugMap(#[from] PlugMapError),
    #[error("plPlugMapM conversion failed")]
    Convert(#[from] ConvertError),
}
