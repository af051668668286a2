use quick_error::quick_error;

quick_error! {
    #[derive(Debug)]
    pub enum CoreError {
        InvalidParameter(why: &'static str) {
            display("invalid parameter: {}", why)
        }
        BufferTooSmall {
            display("outbound buffer is below the minimum request size")
        }
        Cancelled {
            display("volume is being torn down")
        }
        InsufficientResources {
            display("allocation failed while processing a request")
        }
        Truncated {
            display("protocol response truncated")
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
