pub(crate) mod promise;
