pub mod gibbs;
