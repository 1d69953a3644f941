//! Fragment merging.
//!
//! A streamed call arrives as a sequence of partial [`CallDescriptor`]s.
//! Folding them left to right with [`merge`] reconstructs the complete
//! call no matter where the transport split it:
//!
//! - the first fragment establishes the structure;
//! - text fields concatenate, except that an incoming value identical to
//!   the accumulated one is not doubled (transports resend unchanged ids);
//! - the `kind` tag is sticky once it reads `"function"`;
//! - non-text fields (`index`) take the incoming value;
//! - a field the fragment does not carry leaves the accumulated value alone.

use crate::call::{CallDescriptor, FunctionFragment, FUNCTION_KIND};

/// Combine an accumulator with the next fragment. Neither input is modified.
pub fn merge(acc: Option<&CallDescriptor>, fragment: &CallDescriptor) -> CallDescriptor {
    let Some(acc) = acc else {
        return fragment.clone();
    };

    CallDescriptor {
        id: merge_text(acc.id.as_deref(), fragment.id.as_deref()),
        index: fragment.index.or(acc.index),
        kind: merge_kind(acc.kind.as_deref(), fragment.kind.as_deref()),
        function: match (&acc.function, &fragment.function) {
            (Some(existing), Some(incoming)) => Some(merge_function(existing, incoming)),
            (existing, None) => existing.clone(),
            (None, Some(incoming)) => Some(incoming.clone()),
        },
    }
}

/// Left fold of a fragment sequence. `None` when the sequence is empty.
pub fn fold_fragments<'a, I>(fragments: I) -> Option<CallDescriptor>
where
    I: IntoIterator<Item = &'a CallDescriptor>,
{
    fragments
        .into_iter()
        .fold(None, |acc, fragment| Some(merge(acc.as_ref(), fragment)))
}

fn merge_function(existing: &FunctionFragment, incoming: &FunctionFragment) -> FunctionFragment {
    FunctionFragment {
        name: merge_text(existing.name.as_deref(), incoming.name.as_deref()),
        arguments: merge_text(existing.arguments.as_deref(), incoming.arguments.as_deref()),
    }
}

fn merge_kind(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    match (existing, incoming) {
        (_, Some(FUNCTION_KIND)) | (Some(FUNCTION_KIND), _) => Some(FUNCTION_KIND.to_string()),
        (existing, incoming) => merge_text(existing, incoming),
    }
}

fn merge_text(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    match (existing, incoming) {
        (existing, None) => existing.map(String::from),
        (None, Some(incoming)) => Some(incoming.to_string()),
        (Some(existing), Some(incoming)) if existing == incoming => Some(existing.to_string()),
        (Some(existing), Some(incoming)) => Some(format!("{existing}{incoming}")),
    }
}
