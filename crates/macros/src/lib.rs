use proc_macro::TokenStream;
use quote::quote;

#[derive(deluxe::ParseMetaItem)]
#[deluxe(attributes(comparison))]
struct ComparisonAttributes(syn::Ident, #[deluxe(flatten)] ComparisonNamedAttributes);

#[derive(deluxe::ParseMetaItem)]
struct ComparisonNamedAttributes {
  name: String,
  levels: Vec<u8>,
}

/// Turns a `compare` function into a comparison dimension.
///
/// `#[comparison(Postcode, name = "postcode", levels = [5, 4, 3, 2, 1, 0])]`
/// declares a unit struct `Postcode` implementing `Comparison`, reporting the
/// given name and the gamma levels (besides "not comparable") the function
/// can produce.
#[proc_macro_attribute]
pub fn comparison(attrs: TokenStream, input: TokenStream) -> TokenStream {
  let ComparisonAttributes(ident, ComparisonNamedAttributes { name, levels }) = match deluxe::parse2::<ComparisonAttributes>(attrs.into()) {
    Ok(attrs) => attrs,
    Err(err) => return err.into_compile_error().into(),
  };

  let input = proc_macro2::TokenStream::from(input);

  quote! {
      pub(crate) struct #ident;

      impl Comparison for #ident {
        fn name(&self) -> &'static str {
            #name
        }

        fn levels(&self) -> &'static [u8] {
            &[#(#levels),*]
        }

        #[tracing::instrument(level = "trace", name = #name, skip_all, fields(unique_id_l = lhs.unique_id, unique_id_r = rhs.unique_id))]
        #input
      }
  }
  .into()
}
