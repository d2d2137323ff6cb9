use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, LitStr};

/// Splits `"orders(id, amount); users(id, name)"` into tables and columns.
fn parse_tables(source: &str) -> Result<Vec<(String, Vec<String>)>, String> {
    let mut tables = Vec::new();
    for entry in source.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, columns) = match entry.find('(') {
            Some(open) => {
                let Some(body) = entry[open + 1..].strip_suffix(')') else {
                    return Err(format!("missing ')' in table definition '{}'", entry));
                };
                let columns = body
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                (entry[..open].trim(), columns)
            }
            None => (entry, Vec::new()),
        };
        if name.is_empty() {
            return Err(format!("missing table name in '{}'", entry));
        }
        tables.push((name.to_string(), columns));
    }
    Ok(tables)
}

/// Builds a `SchemaCatalog` from a compact table list.
///
/// ```ignore
/// let catalog = catalog!("orders(id, amount, city); public.users(id, name)");
/// ```
#[proc_macro]
pub fn catalog(input: TokenStream) -> TokenStream {
    let input_str = parse_macro_input!(input as LitStr);
    let tables = match parse_tables(&input_str.value()) {
        Ok(tables) => tables,
        Err(message) => {
            return syn::Error::new(input_str.span(), message)
                .to_compile_error()
                .into()
        }
    };

    let names: Vec<&String> = tables.iter().map(|(name, _)| name).collect();
    let columns: Vec<&Vec<String>> = tables.iter().map(|(_, columns)| columns).collect();

    quote! {
        {
            let mut catalog = ::sqlguard_core::analyzer::context::SchemaCatalog::new();
            #(
                {
                    let columns: &[&str] = &[#(#columns),*];
                    catalog.insert_table(#names, columns);
                }
            )*
            catalog
        }
    }
    .into()
}
