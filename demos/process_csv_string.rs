use csv_batch_rs::{
    core::processor::CsvProcessor, error::BatchError, item::csv::csv_format::CsvFormat,
    item::logger::LoggerHandler,
};

fn main() -> Result<(), BatchError> {
    env_logger::init();

    let csv = "year,make,model,description
1948,Porsche,356,Luxury sports car
1995,Peugeot,205,City car
2021,Mazda,CX-30,\"SUV, Compact\"
1967,Ford,Mustang fastback 1967,American car";

    let format = CsvFormat::csv(true);
    let mut handler = LoggerHandler::default();

    let result = CsvProcessor::set_wise(&mut handler).process_csv("cars", csv, &format, 2, 0)?;

    println!("{}", result.output);
    assert_eq!(4, handler.records());
    assert_eq!(5, result.rows_processed);

    Ok(())
}
