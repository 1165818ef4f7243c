use poem_openapi::Object;

/// `action` is parsed by the dispatcher so that unknown values are reported
/// as invalid input rather than a schema error.
#[derive(Object, Debug)]
pub struct DispatchControlRequestDto {
    #[oai(validator(min_length = 1, max_length = 16))]
    pub action: String,
}
