use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that the scratch wallet directory is removed regardless of how
/// the test terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// `crate::harness::Harness`, and `crate::model::identity::FileSystemWallet`.
///
/// `#[backend_test(admin)]` enrolls the administrator before the client is
/// built, so the server starts ready rather than degraded.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let enroll_admin = match parse_macro_input!(args as Option<Ident>) {
        None => false,
        Some(arg) if arg == "admin" => true,
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or no argument")
                .into_compile_error()
                .into();
        }
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup(dir: &std::path::Path) -> (
                rocket::local::asynchronous::Client,
                crate::harness::Harness,
            ) {
                let harness = crate::harness::Harness::new(dir);
                let rocket_client = rocket::local::asynchronous::Client::tracked(harness.rocket(#enroll_admin).await)
                    .await
                    .unwrap();
                (rocket_client, harness)
            }

            /// The test itself.
            #item_fn

            log4rs_test_utils::test_logging::init_logging_once_for(
                ["chainvote_backend"],
                None,
                None,
            );

            let dir = tempfile::tempdir().unwrap();

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup and the test, catching any panics.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                runtime.block_on(async {
                    #[allow(unused_variables)]
                    let (rocket_client, harness) = setup(dir.path()).await;
                    #[allow(unused_variables)]
                    let wallet =
                        crate::model::identity::FileSystemWallet::open(dir.path()).unwrap();
                    #new_name(#(#test_args),*).await;
                })
            }));

            // Run the cleanup.
            drop(runtime);
            drop(dir);

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut seen: Vec<String> = vec![];
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        let injected = if type_ident == "Client" {
                            Some(quote! { rocket_client })
                        } else if type_ident == "Harness" {
                            Some(quote! { harness })
                        } else if type_ident == "FileSystemWallet" {
                            Some(quote! { wallet })
                        } else {
                            None
                        };
                        if let Some(injected) = injected {
                            let type_name = type_ident.to_string();
                            if seen.contains(&type_name) {
                                return Err(syn::Error::new(
                                    input.span(),
                                    format!("Test cannot accept more than one `{type_name}`"),
                                ));
                            }
                            seen.push(type_name);
                            args.push(injected);
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `harness_ident: Harness` or `wallet_ident: FileSystemWallet`",
        ));
    }

    Ok(args)
}
