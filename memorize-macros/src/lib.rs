use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Expr, FnArg, ItemFn, MetaNameValue, ReturnType, Token};

/// Procedural macro that memoizes a function across program executions.
///
/// Results are persisted to a `.cache` file named after the defining source
/// file and the function, and reloaded (lazily, once) on the next run. If
/// the source file has been modified since the cache was written, the whole
/// cache is discarded and rebuilt.
///
/// - Cache keys are built per argument with the fallible `CacheableKey`
///   probe; an argument that cannot be keyed makes the call bypass caching
///   entirely (the function runs, nothing is stored, nothing is raised).
/// - For receiver methods, `self` is the leading key component; implement
///   `DefaultCacheableKey` (or `CacheableKey`) for the receiver type.
/// - Functions returning `Result<T, E>` cache only `Ok` results; a failed
///   call is never cached.
/// - The return type must be `Clone + Serialize + DeserializeOwned`.
///
/// # Attribute arguments
///
/// - `name = "..."` - override the function-name component of the cache
///   file (useful when two memoized functions would slugify identically).
/// - `location = "current_dir" | "source_dir"` - place the cache file in
///   the process's working directory or beside the defining source file,
///   overriding the process-wide `set_cache_location` switch.
///
/// # Examples
///
/// ```ignore
/// use memorize::memorize;
///
/// #[memorize]
/// fn fibonacci(n: u32) -> u64 {
///     if n <= 1 {
///         return n as u64;
///     }
///     fibonacci(n - 1) + fibonacci(n - 2)
/// }
/// ```
#[proc_macro_attribute]
pub fn memorize(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let mut custom_name: Option<String> = None;
    let mut location: TokenStream2 = TokenStream2::new();

    if !attr.is_empty() {
        let args = parse_macro_input!(
            attr with Punctuated::<MetaNameValue, Token![,]>::parse_terminated
        );
        for nv in args.iter() {
            if nv.path.is_ident("name") {
                match parse_string_attribute(nv) {
                    Some(value) => custom_name = Some(value),
                    None => {
                        return TokenStream::from(quote! {
                            compile_error!("Invalid syntax for `name`: expected `name = \"...\"`");
                        })
                    }
                }
            } else if nv.path.is_ident("location") {
                match parse_location_attribute(nv) {
                    Ok(tokens) => location = tokens,
                    Err(err) => return TokenStream::from(err),
                }
            } else {
                return TokenStream::from(quote! {
                    compile_error!("Unknown attribute: expected `name` or `location`");
                });
            }
        }
    }

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let ident = &sig.ident;
    let block = &input.block;

    let ret_type = match &sig.output {
        ReturnType::Type(_, ty) => quote! { #ty },
        ReturnType::Default => quote! { () },
    };

    let mut arg_names = Vec::new();
    let mut has_self = false;

    for arg in sig.inputs.iter() {
        match arg {
            FnArg::Receiver(_) => has_self = true,
            FnArg::Typed(pat_type) => {
                let pat = &pat_type.pat;
                arg_names.push(quote! { #pat });
            }
        }
    }

    let cache_name = custom_name.unwrap_or_else(|| ident.to_string());
    let store_ident = format_ident!("_MEMO_{}_STORE", ident.to_string().to_uppercase());

    // Build the key with the fallible `CacheableKey` probe: any part that
    // cannot be keyed turns the whole call into the bypass branch.
    let self_part = if has_self {
        // Method-call syntax so auto-deref resolves the receiver type
        // instead of `&&Self`.
        quote! {
            match self.try_cache_key() {
                Some(part) => key_parts.push(part),
                None => return None,
            }
        }
    } else {
        quote! {}
    };

    let key_expr = quote! {
        {
            #[allow(unused_mut)]
            let mut key_parts: Vec<String> = Vec::new();
            #[allow(unused_mut)]
            let mut build = || -> Option<()> {
                #self_part
                #( key_parts.push((#arg_names).try_cache_key()?); )*
                Some(())
            };
            match build() {
                Some(()) => Some(key_parts.join("|")),
                None => None,
            }
        }
    };

    let is_result = quote!(#ret_type)
        .to_string()
        .replace(' ', "")
        .starts_with("Result<")
        || quote!(#ret_type)
            .to_string()
            .replace(' ', "")
            .starts_with("std::result::Result<");

    let store_init = quote! {
        ::std::cell::RefCell::new(
            memorize_core::PersistentCache::resolve(
                env!("CARGO_MANIFEST_DIR"),
                file!(),
                #cache_name,
            )#location
        )
    };

    let expanded = if is_result {
        quote! {
            #(#attrs)*
            #vis #sig {
                use memorize_core::{CacheableKey, PersistentCache};

                thread_local! {
                    static #store_ident: ::std::cell::RefCell<PersistentCache<#ret_type>> =
                        #store_init;
                }

                let __key: Option<String> = #key_expr;

                let __key = match __key {
                    Some(key) => key,
                    // Unkeyable arguments: invoke directly, cache nothing.
                    None => return (|| -> #ret_type #block)(),
                };

                if let Some(cached) = #store_ident.with(|s| s.borrow_mut().get(&__key)) {
                    if let Ok(value) = cached {
                        return Ok(value);
                    }
                }

                let __result = (|| -> #ret_type #block)();

                // Failed calls are never cached.
                if __result.is_ok() {
                    #store_ident.with(|s| s.borrow_mut().insert(&__key, __result.clone()));
                }

                __result
            }
        }
    } else {
        quote! {
            #(#attrs)*
            #vis #sig {
                use memorize_core::{CacheableKey, PersistentCache};

                thread_local! {
                    static #store_ident: ::std::cell::RefCell<PersistentCache<#ret_type>> =
                        #store_init;
                }

                let __key: Option<String> = #key_expr;

                let __key = match __key {
                    Some(key) => key,
                    // Unkeyable arguments: invoke directly, cache nothing.
                    None => return (|| -> #ret_type #block)(),
                };

                if let Some(cached) = #store_ident.with(|s| s.borrow_mut().get(&__key)) {
                    return cached;
                }

                let __result = (|| -> #ret_type #block)();

                #store_ident.with(|s| s.borrow_mut().insert(&__key, __result.clone()));

                __result
            }
        }
    };

    TokenStream::from(expanded)
}

/// Parse a string-valued attribute like `name = "..."`.
fn parse_string_attribute(nv: &MetaNameValue) -> Option<String> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            syn::Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        _ => None,
    }
}

/// Parse the `location` attribute into a `with_location(...)` builder call.
fn parse_location_attribute(nv: &MetaNameValue) -> Result<TokenStream2, TokenStream2> {
    match parse_string_attribute(nv).as_deref() {
        Some("current_dir") => Ok(quote! {
            .with_location(memorize_core::CacheLocation::CurrentDir)
        }),
        Some("source_dir") => Ok(quote! {
            .with_location(memorize_core::CacheLocation::SourceDir)
        }),
        _ => Err(quote! {
            compile_error!(
                "Invalid `location`: expected `location = \"current_dir\"` or `location = \"source_dir\"`"
            );
        }),
    }
}
