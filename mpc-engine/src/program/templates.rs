//! The two MPC program templates a party renders before compiling: one for sharing a
//! new secret, one for querying the aggregate over all secrets shared so far.
//!
//! Templates are plain strings with `{{placeholder}}` substitution; there is no
//! templating engine here because the placeholder set is small and fixed and the
//! party never needs anything a string `replace` can't do.

use mpc_types::proof::EncodingDelta;

use crate::program::delta_literal;

/// Marks a line that only makes sense when loading a pre-existing share file. Lines
/// carrying this marker are stripped from the rendered source on a party's first run,
/// when no prior share file exists to load.
const SKIP_ON_FIRST_RUN_MARKER: &str = "# skip-on-first-run";

/// The sharing program template, rendered once per `request_sharing_data_mpc` call.
const SHARING_TEMPLATE: &str = "\
# skip-on-first-run
load_shares('Transactions-P{{party_id}}.data')
secret_index = {{secret_index}}
max_data_providers = {{max_data_providers}}
input_bytes = {{input_bytes}}
client_port_base = {{client_port_base}}
delta = {{delta}}
zero_encodings = {{zero_encodings}}
share_and_commit(secret_index, input_bytes, delta, zero_encodings, client_port_base)
save_shares('Transactions-P{{party_id}}.data')
";

/// The query program template, rendered once per `request_querying_computation_mpc`
/// call.
const QUERY_TEMPLATE: &str = "\
load_shares('Transactions-P{{party_id}}.data')
num_data_providers = {{num_data_providers}}
client_port_base = {{client_port_base}}
compute_statistics(num_data_providers, client_port_base)
";

/// The parameters substituted into [`SHARING_TEMPLATE`].
pub struct SharingParams {
    /// This party's id, used to name its share file.
    pub party_id: usize,
    /// The index this secret occupies among all secrets shared so far.
    pub secret_index: u64,
    /// The configured maximum number of data providers.
    pub max_data_providers: u64,
    /// The number of bytes the secret occupies.
    pub input_bytes: usize,
    /// The (equal) 16-byte encoding delta extracted from the proof.
    pub delta: EncodingDelta,
    /// The zero-encodings table extracted from the proof.
    pub zero_encodings: Vec<Vec<u8>>,
    /// The first port of the client-side port window.
    pub client_port_base: u16,
    /// Whether this party has no pre-existing share file.
    pub first_run: bool,
}

/// Renders [`SHARING_TEMPLATE`] for `params`.
pub fn render_sharing_program(params: &SharingParams) -> String {
    let zero_encodings_literal = params
        .zero_encodings
        .iter()
        .map(|enc| format!("0x{}", hex::encode(enc)))
        .collect::<Vec<_>>()
        .join(", ");

    let rendered = SHARING_TEMPLATE
        .replace("{{party_id}}", &params.party_id.to_string())
        .replace("{{secret_index}}", &params.secret_index.to_string())
        .replace(
            "{{max_data_providers}}",
            &params.max_data_providers.to_string(),
        )
        .replace("{{input_bytes}}", &params.input_bytes.to_string())
        .replace("{{client_port_base}}", &params.client_port_base.to_string())
        .replace("{{delta}}", &delta_literal(&params.delta))
        .replace("{{zero_encodings}}", &format!("[{zero_encodings_literal}]"));

    strip_first_run_markers(&rendered, params.first_run)
}

/// The parameters substituted into [`QUERY_TEMPLATE`].
pub struct QueryParams {
    /// This party's id, used to name its share file.
    pub party_id: usize,
    /// The number of data providers currently on record.
    pub num_data_providers: u64,
    /// The first port of the client-side port window.
    pub client_port_base: u16,
}

/// Renders [`QUERY_TEMPLATE`] for `params`.
pub fn render_query_program(params: &QueryParams) -> String {
    QUERY_TEMPLATE
        .replace("{{party_id}}", &params.party_id.to_string())
        .replace(
            "{{num_data_providers}}",
            &params.num_data_providers.to_string(),
        )
        .replace("{{client_port_base}}", &params.client_port_base.to_string())
}

/// Removes every line carrying [`SKIP_ON_FIRST_RUN_MARKER`] when `first_run` is true;
/// otherwise returns `rendered` unchanged.
fn strip_first_run_markers(rendered: &str, first_run: bool) -> String {
    if !first_run {
        return rendered.to_string();
    }
    rendered
        .lines()
        .filter(|line| !line.contains(SKIP_ON_FIRST_RUN_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params(first_run: bool) -> SharingParams {
        SharingParams {
            party_id: 0,
            secret_index: 3,
            max_data_providers: 100,
            input_bytes: 4,
            delta: [7u8; 16],
            zero_encodings: vec![vec![0u8; 16]; 32],
            client_port_base: 14_000,
            first_run,
        }
    }

    #[test]
    fn strips_skip_on_first_run_line_on_first_run() {
        let rendered = render_sharing_program(&sample_params(true));
        assert!(!rendered.contains("load_shares"));
        assert!(rendered.contains("secret_index = 3"));
    }

    #[test]
    fn keeps_load_shares_line_on_later_runs() {
        let rendered = render_sharing_program(&sample_params(false));
        assert!(rendered.contains("load_shares('Transactions-P0.data')"));
    }

    #[test]
    fn query_program_has_no_first_run_markers() {
        let rendered = render_query_program(&QueryParams {
            party_id: 1,
            num_data_providers: 42,
            client_port_base: 15_000,
        });
        assert!(rendered.contains("num_data_providers = 42"));
    }
}
