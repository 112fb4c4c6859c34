use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies.
///
/// Every test gets a fresh `crate::backend::fake::FakeBackend` behind a
/// tracked [`rocket::local::asynchronous::Client`]; either or both can be
/// requested as parameters of type `Client` and `FakeBackend`. Passing
/// `elector` or `admin` signs the client in as the matching example user
/// before the test body runs.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the arguments to pass and reject invalid function signatures.
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

    // Log in the client as elector/admin if needed.
    let login_as = parse_macro_input!(args as Option<Ident>);
    let maybe_login = match login_as {
        None => quote! {},
        Some(arg) => {
            let credentials = if arg == "elector" {
                quote! { crate::model::user::Credentials::example_elector() }
            } else if arg == "admin" {
                quote! { crate::model::user::Credentials::example_admin() }
            } else {
                return syn::Error::new(arg.span(), "Expected `elector` or `admin`")
                    .into_compile_error()
                    .into();
            };
            quote! {
                let response = rocket_client
                    .post(rocket::uri!(crate::api::auth::login))
                    .header(rocket::http::ContentType::JSON)
                    .body(rocket::serde::json::json!(#credentials).to_string())
                    .dispatch()
                    .await;
                assert_eq!(response.status(), rocket::http::Status::Ok, "Test login failed");
            }
        }
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::backend::fake::FakeBackend) {
                let backend = crate::backend::fake::FakeBackend::new();
                let upstream = crate::backend::Upstream::from(std::sync::Arc::new(backend.clone()));
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::rocket_for_backend(upstream))
                    .await
                    .unwrap();

                {
                    #maybe_login
                }

                (rocket_client, backend)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, backend) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_backend = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        if type_ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(input.span(), "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                            }
                            has_client = true;
                            args.push(quote! { rocket_client });
                            continue;
                        } else if type_ident == "FakeBackend" {
                            if has_backend {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `FakeBackend`",
                                ));
                            }
                            has_backend = true;
                            args.push(quote! { backend });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `backend_ident: FakeBackend`",
        ));
    }

    Ok(args)
}
