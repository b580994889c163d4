use std::fmt::{self, Debug, Display, Formatter};

use super::storage::Render;
use super::Tensor;
use crate::dispatch::dispatch;

impl Tensor {
    fn footer(&self) -> String {
        if self.is_empty() {
            return String::from("[ unknown tensor ]");
        }
        let sizes = self
            .sizes()
            .iter()
            .map(|size| size.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("[ {}{{{}}} ]", self.type_desc(), sizes)
    }
}

impl Display for Tensor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.is_empty() {
            let body = dispatch(Render, self).map_err(|_| fmt::Error)?;
            writeln!(f, "{body}")?;
        }
        f.write_str(&self.footer())
    }
}

impl Debug for Tensor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut st = f.debug_struct("Tensor");
        st.field("element_type", &self.element_type);
        st.field("device", &self.device);
        if !self.is_empty() {
            st.field("sizes", &self.sizes());
            st.field("strides", &self.strides());
            st.field("is_scalar", &self.is_scalar);
            match dispatch(Render, self) {
                Ok(data) => st.field("data", &format_args!("{data}")),
                Err(err) => st.field("data", &format_args!("<{err}>")),
            };
        }
        st.finish()
    }
}
