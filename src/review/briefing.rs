use super::report::ReviewReport;

fn or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{}", v))
}

/// Narrative summary interpolated from a report
pub fn render(report: &ReviewReport) -> String {
    let record = &report.record;
    let ruc = &report.stages.ruc;
    let window = &report.window;
    let refinement = &report.refinement;

    let mut text = format!(
        "The code review search is for {code}. The RUC recommended a work RVU of {ruc_work} \
         and Total Time of {ruc_tt}. The Total Time search parameters for this review are from \
         {tt_lower} to {tt_upper} minutes. The intraservice time search parameters are from \
         {ist_lower} to {ist_upper} minutes. The Median Work RVU for the search is {median}. \
         The count of all reference codes in the search is {population}. Of these, the count of \
         codes in the bottom quartile, based on work RVU, is {quartile}. ",
        code = record.hcpcs,
        ruc_work = ruc.work,
        ruc_tt = ruc.tt,
        tt_lower = window.time_lower,
        tt_upper = window.time_upper,
        ist_lower = window.intraservice_lower,
        ist_upper = window.intraservice_upper,
        median = or_na(refinement.quartile_median_work),
        population = refinement.population_count,
        quartile = refinement.quartile_count,
    );

    text.push_str(&format!(
        "The initial search identified {population} codes with a global value of {global} and \
         with a total time from {tt_lower} to {tt_upper}. Of the codes reviewed, {below} of the \
         {quartile} codes in the bottom quartile of the reference services have wRVUs lower than \
         the RUC-recommended wRVU of {ruc_work}. ",
        population = refinement.population_count,
        global = record.global_value,
        tt_lower = window.time_lower,
        tt_upper = window.time_upper,
        below = refinement.below_target_count,
        quartile = refinement.quartile_count,
        ruc_work = ruc.work,
    ));

    text.push_str(&format!(
        "The total time ratio between the current time of {current_tt} minutes and the \
         recommended time established by the RUC of {ruc_tt} minutes is {ratio:.4}. This ratio \
         equals {percent:.2} percent, and when multiplied by the current wRVU of {current_work} \
         equals {ratio_work:.2}.",
        current_tt = record.current_tt,
        ruc_tt = ruc.tt,
        ratio = refinement.time_ratio,
        percent = refinement.time_ratio_percent,
        current_work = record.current_work,
        ratio_work = refinement.time_ratio_work,
    ));

    if report.refinement.population_count == 0 {
        text.push_str(" No reference codes matched the search window, so quartile statistics are unavailable.");
    }
    text
}
