use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{spanned::Spanned, ItemFn};

/// Proc macro to denote a Transaction
///
/// A transaction is a single request against the system under test. Its latency is recorded
/// under the tag of the scenario (or setup/teardown phase) that issued it, and it counts as a
/// failed request when it returns `Err` or an `Ok` value whose
/// [`Outcome::is_failure`](../surge/transaction/trait.Outcome.html) is true.
///
/// NOTE: Currently this macro only works on `async` functions with a `Result<T, E>` return value.
///
/// # Example
/// ```ignore
/// use surge::prelude::*;
///
/// #[transaction]
/// async fn get_post(client: &Client, id: u64) -> Result<Response, MyError> {
///     ...
/// }
/// ```
#[proc_macro_attribute]
pub fn transaction(attr: TokenStream, item: TokenStream) -> TokenStream {
    transaction_internal(attr, item.into()).into()
}

fn transaction_internal(_attr: TokenStream, item: TokenStream2) -> TokenStream2 {
    let input = match syn::parse2::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    if input.sig.asyncness.is_none() {
        return syn::Error::new(input.sig.span(), "#[transaction] requires an async fn")
            .to_compile_error();
    }

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    let stmts = &block.stmts;

    quote! {
        #(#attrs)* #vis #sig {
            ::surge::transaction::transaction_hook(async move {
                #(#stmts)*
            }).await
        }
    }
}
