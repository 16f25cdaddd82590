pub mod mem_size;
