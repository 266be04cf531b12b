use nom::Needed;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The buffer is shorter than the field that was asked for.
    /// `needed` is the minimum total length the buffer must have.
    #[error("Frame too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("(FCS) mismatch {computed:08x} {received:08x}")]
    FcsMismatch { computed: u32, received: u32 },

    /// A tagged parameter was found where another tag id was expected.
    #[error("Unexpected tagged parameter id {0}")]
    InvalidTag(u8),

    #[error("Tagged parameter length {0} exceeds its maximum")]
    InvalidTagLength(u8),

    #[error("A parsing failure occurred: \n{}\ndata: {:?}", .0, .1)]
    Failure(String, Vec<u8>),
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for Error {
    /// Manually specify the conversion from a [nom::error::Error] to our own error.
    /// nom's error borrows the input slice, which we can't hand out of the parser.
    fn from(error: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        match error {
            nom::Err::Incomplete(needed) => match needed {
                Needed::Size(size) => Error::Failure(
                    format!("At least {size} bytes are missing"),
                    Vec::new(),
                ),
                Needed::Unknown => Error::Failure("Incomplete input".to_string(), Vec::new()),
            },
            nom::Err::Failure(error) | nom::Err::Error(error) => Error::Failure(
                format!(
                    "An error occured while parsing the data: nom::ErrorKind is {:?}",
                    error.code
                ),
                error.input.to_vec(),
            ),
        }
    }
}
