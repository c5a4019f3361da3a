//! The generic write hook.

use dioxus::prelude::*;

use crate::{
    mutation::Mutation,
    state::State,
    types::{MutationInputBounds, MutationSignal},
};

use super::use_query_client;

/// Hook to run a [`Mutation`] through the nearest query client.
///
/// Returns the mutation state and a trigger. Each call of the trigger moves the
/// state to [`State::Loading`], issues exactly one write, and settles in
/// [`State::Success`] or [`State::Error`]. A successful write invalidates every
/// cached read of the mutation's resource; a failed one invalidates nothing.
///
/// ## Example
///
/// ```rust,no_run
/// use dioxus::prelude::*;
/// use scout_data::prelude::*;
///
/// #[component]
/// fn RemoveSchool(id: String) -> Element {
///     let (state, delete) = use_mutation(DeleteRecord::<School>::new());
///     rsx! {
///         button {
///             disabled: state.read().is_loading(),
///             onclick: move |_| delete(id.clone()),
///             "Delete"
///         }
///     }
/// }
/// ```
pub fn use_mutation<M, I>(mutation: M) -> (MutationSignal<M::Output>, impl Fn(I) + Clone)
where
    M: Mutation<I>,
    I: MutationInputBounds,
{
    let client = use_query_client();
    let state = use_signal(|| State::Idle);

    let trigger = move |input: I| {
        let client = client.clone();
        let mutation = mutation.clone();
        let mut state = state;
        state.set(State::Loading);
        spawn(async move {
            let result = client.mutate(&mutation, input).await;
            state.set(result.into());
        });
    };

    (state, trigger)
}
