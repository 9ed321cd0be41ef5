use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Roles a test can sign in as.
const ROLES: [&str; 4] = ["admin", "commissioner", "super_admin", "voter"];

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// tracking cookies, [`crate::store::MemoryStore`], the store behind
/// that client, and [`crate::store::MongoStore`], connected to a fresh
/// database at the configured `db_uri`. Each test gets fresh stores, and
/// the database is dropped however the test terminates.
///
/// An optional argument names a role (`admin`, `commissioner`,
/// `super_admin` or `voter`) to sign the client in as before the test runs.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the arguments to inject and reject invalid function signatures.
    let Injected {
        args: test_args,
        wants_client,
        wants_store,
        wants_mongo,
    } = match check_sig(item_fn.sig.clone()) {
        Ok(injected) => injected,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Attributes such as `#[ignore]` belong on the generated test.
    let attrs = std::mem::take(&mut item_fn.attrs);

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Sign the client in if asked.
    let role = parse_macro_input!(args as Option<Ident>);
    let maybe_login = match role {
        Some(role) if ROLES.iter().any(|r| role == r) => {
            let example = format_ident!("example_{}", role);
            quote! {
                crate::api::testing::login(
                    &rocket_client,
                    &crate::model::auth::AuthToken::#example(),
                )
                .await;
            }
        }
        Some(role) => {
            return syn::Error::new(
                role.span(),
                format!("Unknown role `{role}`, expected one of {ROLES:?}"),
            )
            .into_compile_error()
            .into();
        }
        None => TokenStream2::new(),
    };
    let needs_client = wants_client || !maybe_login.is_empty();

    let setup_client = if needs_client {
        quote! {
            let rocket_client = rocket::local::asynchronous::Client::tracked(
                crate::rocket_for_store(store.clone()),
            )
            .await
            .unwrap();
            #maybe_login
        }
    } else {
        TokenStream2::new()
    };

    let setup_store = if needs_client || wants_store {
        quote! {
            let store = crate::store::MemoryStore::new();
        }
    } else {
        TokenStream2::new()
    };

    let run_test = quote! {
        async {
            #setup_store
            #setup_client
            #new_name(#(#test_args),*).await;
        }
    };

    // Rewrite the test function.
    let test_fn = if wants_mongo {
        quote! {
            #(#attrs)*
            #[test]
            fn #name() {
                /// The test itself.
                #item_fn

                // Create an async runtime. We need a separate one for inside and
                // outside the `catch_unwind`.
                let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                    .thread_name("test-setup-cleanup")
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .unwrap();
                let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                    .thread_name("rocket-worker-test-thread")
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .unwrap();

                // Run the setup.
                let mongo = outer_runtime.block_on(crate::config::test_mongo_store());

                // Run the test, catching any panics.
                // Use mutexes to safely transfer `!UnwindSafe` data.
                let mongo_mutex = std::sync::Mutex::new(mongo.clone());
                let runtime_mutex = std::sync::Mutex::new(inner_runtime);
                let result = std::panic::catch_unwind(|| {
                    let mongo_store = mongo_mutex.into_inner().unwrap();
                    let runtime = runtime_mutex.into_inner().unwrap();
                    runtime.block_on(#run_test);
                });

                // Run the cleanup.
                outer_runtime.block_on(mongo.drop_database()).unwrap();

                if let Err(cause) = result {
                    std::panic::resume_unwind(cause);
                }
            }
        }
    } else {
        quote! {
            #(#attrs)*
            #[test]
            fn #name() {
                /// The test itself.
                #item_fn

                let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                    .thread_name("rocket-worker-test-thread")
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .unwrap();

                runtime.block_on(#run_test);
            }
        }
    };
    test_fn.into()
}

/// What the wrapped test asked for.
struct Injected {
    args: Vec<TokenStream2>,
    wants_client: bool,
    wants_store: bool,
    wants_mongo: bool,
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Injected, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_store = false;
    let mut has_mongo = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(segment) = type_path.path.segments.last() {
                    if segment.ident == "Client" {
                        if has_client {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                            ));
                        }
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    } else if segment.ident == "MemoryStore" {
                        if has_store {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `MemoryStore`",
                            ));
                        }
                        has_store = true;
                        args.push(quote! { store.clone() });
                        continue;
                    } else if segment.ident == "MongoStore" {
                        if has_mongo {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `MongoStore`",
                            ));
                        }
                        has_mongo = true;
                        args.push(quote! { mongo_store.clone() });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `store_ident: MemoryStore` or `store_ident: MongoStore`",
        ));
    }

    Ok(Injected {
        args,
        wants_client: has_client,
        wants_store: has_store,
        wants_mongo: has_mongo,
    })
}
