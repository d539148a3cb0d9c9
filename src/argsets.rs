/// Optional explicit fetch window for partial or backfill runs, as local
/// wall-clock strings in `%Y-%m-%d %H:%M:%S` format.
pub struct UploadArgs {
    pub start: Option<String>,
    pub end: Option<String>,
}
