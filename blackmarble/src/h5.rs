//! HDF5 backed tile containers.

use crate::{
    decode::{Container, ContainerReader, Field, Order},
    BlackMarbleError,
};
use log::debug;
use std::path::Path;

pub struct H5Container {
    file: hdf5::File,
}

impl H5Container {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BlackMarbleError> {
        debug!("opening {:?}", path.as_ref());
        let file = hdf5::File::open(path)?;
        Ok(Self { file })
    }
}

impl Container for H5Container {
    fn field(&self, path: &str) -> Result<Option<Field>, BlackMarbleError> {
        if !self.file.link_exists(path) {
            return Ok(None);
        }
        let dataset = self.file.dataset(path)?;
        let shape = dataset.shape();
        // HDF5 hands back C-order data, which is already north-up
        // row-major for these grids.
        let values = dataset.read_raw::<f64>()?;
        let fill_value = if dataset.attr_names()?.iter().any(|n| n == "_FillValue") {
            dataset
                .attr("_FillValue")?
                .read_raw::<f64>()?
                .first()
                .copied()
        } else {
            None
        };
        Ok(Some(Field {
            shape,
            order: Order::RowMajor,
            values,
            fill_value,
        }))
    }
}

/// Opens tiles as HDF5 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct H5Reader;

impl ContainerReader for H5Reader {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>, BlackMarbleError> {
        Ok(Box::new(H5Container::open(path)?))
    }
}
